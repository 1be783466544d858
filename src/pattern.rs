//! Pattern strings exchanged with the Dump Hub server.
//!
//! Two encodings exist and are not interchangeable:
//! - upload side `{separator}{commentChar}`, read by the ingester on write
//! - analyze side `{startLine}{separator}`, read by the analysis job
//!
//! The server scans both positionally, so the rendered bytes must match
//! exactly.

use crate::error::{DumpHubError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parsing options attached to an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPattern {
    pub separator: String,
    #[serde(rename = "commentChar")]
    pub comment_char: Option<char>,
}

impl Default for UploadPattern {
    fn default() -> Self {
        Self {
            separator: ":".to_string(),
            comment_char: Some('#'),
        }
    }
}

impl UploadPattern {
    pub fn new(separator: impl Into<String>, comment_char: Option<char>) -> Self {
        Self {
            separator: separator.into(),
            comment_char,
        }
    }

    pub fn render(&self) -> String {
        let comment = self.comment_char.map(String::from).unwrap_or_default();
        format!("{{{}}}{{{}}}", self.separator, comment)
    }

    /// Parse `{separator}{commentChar}`.
    ///
    /// The comment field is read from the end: it is empty or exactly one
    /// character, so a separator containing braces still round-trips.
    pub fn parse(pattern: &str) -> Result<Self> {
        let body = strip_outer_braces(pattern)?;

        if let Some(separator) = body.strip_suffix("}{") {
            return Self::checked(separator, None, pattern);
        }

        let mut chars = body.chars();
        let comment = chars
            .next_back()
            .ok_or_else(|| malformed(pattern, "missing comment field"))?;
        let separator = chars
            .as_str()
            .strip_suffix("}{")
            .ok_or_else(|| malformed(pattern, "comment field must be one character"))?;

        Self::checked(separator, Some(comment), pattern)
    }

    fn checked(separator: &str, comment_char: Option<char>, pattern: &str) -> Result<Self> {
        if separator.is_empty() {
            return Err(malformed(pattern, "empty separator"));
        }
        Ok(Self::new(separator, comment_char))
    }
}

impl fmt::Display for UploadPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Parsing options for analyzing a stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzePattern {
    #[serde(rename = "startLine")]
    pub start_line: usize,
    pub separator: String,
}

impl Default for AnalyzePattern {
    fn default() -> Self {
        Self {
            start_line: 0,
            separator: ":".to_string(),
        }
    }
}

impl AnalyzePattern {
    pub fn new(start_line: usize, separator: impl Into<String>) -> Self {
        Self {
            start_line,
            separator: separator.into(),
        }
    }

    pub fn render(&self) -> String {
        format!("{{{}}}{{{}}}", self.start_line, self.separator)
    }

    /// Parse `{startLine}{separator}` the way the analysis job reads it:
    /// a decimal start line and a single-character separator.
    pub fn parse(pattern: &str) -> Result<Self> {
        let body = strip_outer_braces(pattern)?;
        let (start, separator) = body
            .split_once("}{")
            .ok_or_else(|| malformed(pattern, "expected two fields"))?;

        let start_line = start
            .parse::<usize>()
            .map_err(|e| malformed(pattern, &format!("bad start line: {}", e)))?;

        if separator.chars().count() != 1 {
            return Err(malformed(pattern, "separator must be one character"));
        }

        Ok(Self::new(start_line, separator))
    }
}

impl fmt::Display for AnalyzePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn strip_outer_braces(pattern: &str) -> Result<&str> {
    pattern
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| malformed(pattern, "must be brace delimited"))
}

fn malformed(pattern: &str, reason: &str) -> DumpHubError {
    DumpHubError::Pattern(format!("'{}': {}", pattern, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_pattern_render() {
        assert_eq!(UploadPattern::default().render(), "{:}{#}");
        assert_eq!(UploadPattern::new(";", None).render(), "{;}{}");
        assert_eq!(UploadPattern::new("::", Some('%')).to_string(), "{::}{%}");
    }

    #[test]
    fn test_analyze_pattern_render() {
        assert_eq!(AnalyzePattern::default().render(), "{0}{:}");
        assert_eq!(AnalyzePattern::new(12, "|").render(), "{12}{|}");
    }

    #[test]
    fn test_upload_pattern_parse() {
        assert_eq!(
            UploadPattern::parse("{:}{#}").unwrap(),
            UploadPattern::new(":", Some('#'))
        );
        assert_eq!(
            UploadPattern::parse("{;}{}").unwrap(),
            UploadPattern::new(";", None)
        );
        // Brace separators are read positionally
        assert_eq!(
            UploadPattern::parse("{}}{#}").unwrap(),
            UploadPattern::new("}", Some('#'))
        );
    }

    #[test]
    fn test_upload_pattern_parse_rejects_malformed() {
        assert!(UploadPattern::parse(":#").is_err());
        assert!(UploadPattern::parse("{}{#}").is_err());
        assert!(UploadPattern::parse("{:}{##}").is_err());
    }

    #[test]
    fn test_analyze_pattern_parse() {
        assert_eq!(
            AnalyzePattern::parse("{3}{,}").unwrap(),
            AnalyzePattern::new(3, ",")
        );
        assert!(AnalyzePattern::parse("{x}{,}").is_err());
        assert!(AnalyzePattern::parse("{3}{::}").is_err());
        assert!(AnalyzePattern::parse("{3}").is_err());
    }
}
