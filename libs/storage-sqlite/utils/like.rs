pub(crate) const LIKE_ESCAPE: char = '!';

/// SQL expression escaping the three LIKE metacharacters of `column` at query
/// time and appending the open wildcard, so each persisted prefix turns into
/// a starts-with pattern the subject can be matched against.
pub(crate) fn escaped_prefix_pattern(column: &str) -> String {
    format!(
        "replace(replace(replace({column}, '!', '!!'), '%', '!%'), '_', '!_') || '%'"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(subject: &str, prefix: &str) -> bool {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let sql = format!(
            "SELECT ?1 LIKE {} ESCAPE '{}'",
            escaped_prefix_pattern("?2"),
            LIKE_ESCAPE
        );
        conn.query_row(&sql, [subject, prefix], |row| row.get(0))
            .unwrap()
    }

    #[test]
    pub fn test_pattern_matches_literal_prefixes() {
        assert!(matches("http://a.com/page", "http://a.com/"));
        assert!(matches("http://a.com/", "http://a.com/"));
        assert!(!matches("http://b.com/", "http://a.com/"));
        // The empty prefix matches everything.
        assert!(matches("anything", ""));
    }

    #[test]
    pub fn test_metacharacters_are_escaped() {
        assert!(matches("100%_done!", "100%_done!"));
        assert!(!matches("100xydonez", "100%_done!"));
        assert!(!matches("a_b", "axb"));
        assert!(matches("a_b/tail", "a_b"));
    }
}
