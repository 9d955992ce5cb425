/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Single-line snippet for prompts and stored evidence: whitespace
/// collapsed, then truncated.
pub fn snippet(s: &str, max: usize) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, max)
}

/// First non-empty line of a diagnostic blob, truncated.
pub fn first_line(s: &str, max: usize) -> Option<String> {
    s.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| truncate_chars(line, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn snippet_collapses_whitespace() {
        assert_eq!(snippet("a\n  b\t c", 100), "a b c");
    }

    #[test]
    fn first_line_skips_blanks() {
        assert_eq!(
            first_line("\n\n  TypeError: boom\nmore", 80),
            Some("TypeError: boom".to_string())
        );
        assert_eq!(first_line("   \n\n", 80), None);
    }
}
