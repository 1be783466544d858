//! Delimiter-driven table parsing for preview lines.

use serde::{Deserialize, Serialize};

use super::SENTINEL;

/// Rectangular preview table: every row has `max_cols` cells
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewTable {
    pub rows: Vec<Vec<String>>,
    #[serde(rename = "maxCols")]
    pub max_cols: usize,
}

impl PreviewTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Split one preview line into its raw fields.
///
/// Only the first literal space is removed before splitting, and the
/// separator is matched as a literal substring.
pub fn split_fields(line: &str, separator: &str) -> Vec<String> {
    let line = line.replacen(' ', "", 1);

    if separator.is_empty() {
        // An empty separator yields one field per character
        return line.chars().map(String::from).collect();
    }

    line.split(separator).map(str::to_string).collect()
}

/// Parse lines into a table padded with the sentinel.
///
/// Fields shorter than two characters are treated as absent. A separator
/// that never matches degrades to a one-column table.
pub fn parse<S: AsRef<str>>(lines: &[S], separator: &str) -> PreviewTable {
    let split: Vec<Vec<String>> = lines
        .iter()
        .map(|line| split_fields(line.as_ref(), separator))
        .collect();

    let max_cols = split.iter().map(Vec::len).max().unwrap_or(0);

    let rows = split
        .into_iter()
        .map(|fields| {
            let mut row = vec![SENTINEL.to_string(); max_cols];
            for (cell, field) in row.iter_mut().zip(fields) {
                if field.chars().count() > 1 {
                    *cell = field;
                }
            }
            row
        })
        .collect();

    PreviewTable { rows, max_cols }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_rows_are_padded() {
        let table = parse(&["a:bb:c", "xx:y"], ":");

        assert_eq!(table.max_cols, 3);
        assert_eq!(table.rows[0], vec!["N/A", "bb", "N/A"]);
        assert_eq!(table.rows[1], vec!["xx", "N/A", "N/A"]);
    }

    #[test]
    fn test_only_first_space_is_removed() {
        let fields = split_fields(" john doe:secret pw", ":");
        assert_eq!(fields, vec!["john doe", "secret pw"]);
    }

    #[test]
    fn test_separator_is_literal() {
        let table = parse(&["ab.*cd.*ef", "abxcd"], ".*");

        assert_eq!(table.max_cols, 3);
        assert_eq!(table.rows[0], vec!["ab", "cd", "ef"]);
        assert_eq!(table.rows[1], vec!["abxcd", "N/A", "N/A"]);
    }

    #[test]
    fn test_unmatched_separator_gives_one_column() {
        let table = parse(&["alice@example.org", "bob@example.org"], "|");

        assert_eq!(table.max_cols, 1);
        assert_eq!(table.rows[0], vec!["alice@example.org"]);
        assert_eq!(table.rows[1], vec!["bob@example.org"]);
    }

    #[test]
    fn test_short_fields_never_appear() {
        let table = parse(&["a::b:cc", "", "q"], ":");

        for row in &table.rows {
            assert_eq!(row.len(), table.max_cols);
            for cell in row {
                assert!(cell == SENTINEL || cell.chars().count() > 1);
            }
        }
        assert_eq!(table.rows[1], vec!["N/A"; 4]);
    }

    #[test]
    fn test_no_lines() {
        let lines: [&str; 0] = [];
        let table = parse(&lines, ":");
        assert!(table.is_empty());
        assert_eq!(table.max_cols, 0);
    }

    #[test]
    fn test_multibyte_fields_count_characters() {
        let table = parse(&["é:éé"], ":");
        assert_eq!(table.rows[0], vec!["N/A", "éé"]);
    }
}
