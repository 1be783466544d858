//! Line splitting and comment filtering for locally generated previews.

/// Split raw text on runs of `\r` / `\n`.
///
/// Blank lines between content collapse away, while an empty leading or
/// trailing segment is kept (text ending in a newline yields a final `""`).
pub fn split_lines(raw: &str) -> Vec<String> {
    let pieces: Vec<&str> = raw.split(['\r', '\n']).collect();
    let last = pieces.len().saturating_sub(1);

    pieces
        .iter()
        .enumerate()
        .filter(|(index, piece)| !piece.is_empty() || *index == 0 || *index == last)
        .map(|(_, piece)| piece.to_string())
        .collect()
}

/// True when the line starts with the comment character once its first
/// space is removed.
pub fn is_comment(line: &str, comment_char: Option<char>) -> bool {
    match comment_char {
        Some(c) => line.replacen(' ', "", 1).starts_with(c),
        None => false,
    }
}

/// Keep at most `limit` non-comment lines.
///
/// Skipped comment lines do not count toward the limit.
pub fn filter_comments<S: AsRef<str>>(
    lines: &[S],
    comment_char: Option<char>,
    limit: usize,
) -> Vec<String> {
    lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| !is_comment(line, comment_char))
        .take(limit)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_collapses_runs() {
        assert_eq!(split_lines("a\r\n\r\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("a\n\nb\n"), vec!["a", "b", ""]);
        assert_eq!(split_lines("\n\na"), vec!["", "a"]);
        assert_eq!(split_lines(""), vec![""]);
    }

    #[test]
    fn test_comment_lines_are_skipped() {
        let lines = ["#skip", "a:b", "#skip2", "c:d"];
        assert_eq!(filter_comments(&lines, Some('#'), 20), vec!["a:b", "c:d"]);
    }

    #[test]
    fn test_first_space_is_ignored_for_comments() {
        let lines = [" #indented", "  #two spaces", "x:y"];
        assert_eq!(
            filter_comments(&lines, Some('#'), 20),
            vec!["  #two spaces", "x:y"]
        );
    }

    #[test]
    fn test_skipped_lines_do_not_use_budget() {
        let mut lines: Vec<String> = (0..50).map(|i| format!("# comment {}", i)).collect();
        lines.extend((0..30).map(|i| format!("user{}:pw{}", i, i)));

        let kept = filter_comments(&lines[..], Some('#'), 20);
        assert_eq!(kept.len(), 20);
        assert_eq!(kept[0], "user0:pw0");
        assert_eq!(kept[19], "user19:pw19");
    }

    #[test]
    fn test_no_comment_char_keeps_everything() {
        let lines = ["#a", "b"];
        assert_eq!(filter_comments(&lines, None, 20), vec!["#a", "b"]);
    }
}
