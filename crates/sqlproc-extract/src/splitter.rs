//! Line-based SQL statement segmentation.
//!
//! This is not a SQL parser: a statement ends on the first line whose
//! trimmed text ends with `;`, and only whole-line comments are recognized.

use sqlproc_core::SqlType;

/// Statement terminator.
const TERMINATOR: char = ';';

/// A completed statement, before it is bound to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Statement text without its terminator
    pub content: String,
    /// 1-based line number of the first content line
    pub line_num: usize,
}

/// Incremental statement splitter.
///
/// Lines are fed one at a time so statements can be emitted as soon as they
/// are complete rather than after the whole file has been scanned.
#[derive(Debug)]
pub struct StatementSplitter {
    comment_markers: &'static [&'static str],
    buffer: String,
    start_line: Option<usize>,
}

impl StatementSplitter {
    /// Create a splitter using the comment syntax of `sql_type`.
    #[must_use]
    pub fn new(sql_type: SqlType) -> Self {
        Self {
            comment_markers: sql_type.line_comment_markers(),
            buffer: String::new(),
            start_line: None,
        }
    }

    /// Feed one physical line (without its line break).
    ///
    /// Returns the statement completed by this line, if any.
    pub fn feed(&mut self, line_num: usize, line: &str) -> Option<Segment> {
        let line = line.trim_end();

        if self.is_comment(line) {
            return None;
        }

        match self.start_line {
            None if line.is_empty() => return None,
            None => {
                self.start_line = Some(line_num);
                self.buffer.push_str(line);
            }
            Some(_) => {
                self.buffer.push('\n');
                self.buffer.push_str(line);
            }
        }

        if !line.ends_with(TERMINATOR) {
            return None;
        }

        let start_line = self.start_line.take()?;
        let content = self.buffer.trim_end_matches(TERMINATOR).trim_end().to_string();
        self.buffer.clear();

        // A bare terminator carries no statement.
        if content.trim().is_empty() {
            return None;
        }

        Some(Segment {
            content,
            line_num: start_line,
        })
    }

    /// Finish the input, returning any unterminated trailing fragment.
    ///
    /// The fragment is never a statement; callers only use it for logging.
    #[must_use]
    pub fn finish(self) -> Option<Segment> {
        self.start_line.map(|line_num| Segment {
            content: self.buffer,
            line_num,
        })
    }

    fn is_comment(&self, line: &str) -> bool {
        let line = line.trim_start();
        self.comment_markers
            .iter()
            .any(|marker| line.starts_with(marker))
    }
}

/// Split a whole script into statements.
#[must_use]
pub fn split_statements(sql_type: SqlType, text: &str) -> Vec<Segment> {
    let mut splitter = StatementSplitter::new(sql_type);
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| splitter.feed(i + 1, line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(content: &str, line_num: usize) -> Segment {
        Segment {
            content: content.to_string(),
            line_num,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(split_statements(SqlType::Postgres, "").is_empty());
        assert!(split_statements(SqlType::Postgres, "\n\n   \n").is_empty());
    }

    #[test]
    fn test_single_line_statements() {
        let text = "SELECT * FROM users;\n\
                    INSERT INTO users (name, email) VALUES ('John', 'john@example.com');\n\
                    UPDATE users SET name = 'Jane' WHERE id = 1;\n\
                    DELETE FROM users WHERE id = 2;\n";

        let segments = split_statements(SqlType::Sqlite, text);
        assert_eq!(
            segments,
            vec![
                segment("SELECT * FROM users", 1),
                segment(
                    "INSERT INTO users (name, email) VALUES ('John', 'john@example.com')",
                    2
                ),
                segment("UPDATE users SET name = 'Jane' WHERE id = 1", 3),
                segment("DELETE FROM users WHERE id = 2", 4),
            ]
        );
    }

    #[test]
    fn test_comment_between_statements() {
        let text = "SELECT * FROM users;\n-- comment\nDELETE FROM users WHERE id=2;\n";

        let segments = split_statements(SqlType::Postgres, text);
        assert_eq!(
            segments,
            vec![
                segment("SELECT * FROM users", 1),
                segment("DELETE FROM users WHERE id=2", 3),
            ]
        );
    }

    #[test]
    fn test_multiline_statement() {
        let text = "UPDATE users\nSET name = 'Jane'\nWHERE id = 1;\n";

        let segments = split_statements(SqlType::Postgres, text);
        assert_eq!(
            segments,
            vec![segment("UPDATE users\nSET name = 'Jane'\nWHERE id = 1", 1)]
        );
    }

    #[test]
    fn test_leading_comments_and_blank_lines_do_not_move_start() {
        let text = "-- users\n\
                    SELECT * FROM users;\n\
                    \n\
                    -- insert john\n\
                    INSERT INTO users (name, email)\n\
                    VALUES ('John', 'john@example.com');\n\
                    \n\
                    \n\
                    UPDATE users\n\
                    SET name = 'Jane'\n\
                    WHERE id = 1;\n";

        let segments = split_statements(SqlType::Sqlite, text);
        assert_eq!(
            segments,
            vec![
                segment("SELECT * FROM users", 2),
                segment(
                    "INSERT INTO users (name, email)\nVALUES ('John', 'john@example.com')",
                    5
                ),
                segment("UPDATE users\nSET name = 'Jane'\nWHERE id = 1", 9),
            ]
        );
    }

    #[test]
    fn test_comment_inside_statement_is_dropped() {
        let text = "UPDATE users\n  -- only bob\nSET name = 'Bob'\nWHERE id = 4;";

        let segments = split_statements(SqlType::Postgres, text);
        assert_eq!(
            segments,
            vec![segment("UPDATE users\nSET name = 'Bob'\nWHERE id = 4", 1)]
        );
    }

    #[test]
    fn test_indented_comment_is_skipped() {
        let text = "    -- indented\nSELECT 1;";
        assert_eq!(
            split_statements(SqlType::Postgres, text),
            vec![segment("SELECT 1", 2)]
        );
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        let text = "SELECT 1;   \t\nSELECT 2 ;  ";
        assert_eq!(
            split_statements(SqlType::Postgres, text),
            vec![segment("SELECT 1", 1), segment("SELECT 2", 2)]
        );
    }

    #[test]
    fn test_internal_indentation_preserved() {
        let text = "SELECT id,\n       name\n  FROM users;";
        assert_eq!(
            split_statements(SqlType::Postgres, text),
            vec![segment("SELECT id,\n       name\n  FROM users", 1)]
        );
    }

    #[test]
    fn test_blank_line_inside_statement_is_kept() {
        let text = "SELECT *\n\nFROM users;";
        assert_eq!(
            split_statements(SqlType::Postgres, text),
            vec![segment("SELECT *\n\nFROM users", 1)]
        );
    }

    #[test]
    fn test_unterminated_trailing_fragment_dropped() {
        let text = "SELECT 1;\nSELECT 2\nFROM t";
        assert_eq!(
            split_statements(SqlType::Postgres, text),
            vec![segment("SELECT 1", 1)]
        );
    }

    #[test]
    fn test_finish_reports_fragment() {
        let mut splitter = StatementSplitter::new(SqlType::Postgres);
        assert!(splitter.feed(1, "SELECT 1;").is_some());
        assert!(splitter.feed(2, "SELECT 2").is_none());

        assert_eq!(splitter.finish(), Some(segment("SELECT 2", 2)));
    }

    #[test]
    fn test_finish_without_fragment() {
        let mut splitter = StatementSplitter::new(SqlType::Postgres);
        splitter.feed(1, "SELECT 1;");
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_bare_terminator_is_not_a_statement() {
        let text = ";\nSELECT 1;\n  ;";
        assert_eq!(
            split_statements(SqlType::Postgres, text),
            vec![segment("SELECT 1", 2)]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "SELECT 1;\r\n-- c\r\nUPDATE t\r\nSET a = 1;\r\n";
        assert_eq!(
            split_statements(SqlType::Postgres, text),
            vec![segment("SELECT 1", 1), segment("UPDATE t\nSET a = 1", 3)]
        );
    }

    #[test]
    fn test_hash_comment_depends_on_dialect() {
        let text = "# note\nSELECT 1;";

        assert_eq!(
            split_statements(SqlType::MySql, text),
            vec![segment("SELECT 1", 2)]
        );
        // Not a comment outside MySQL, so it becomes part of the statement.
        assert_eq!(
            split_statements(SqlType::Postgres, text),
            vec![segment("# note\nSELECT 1", 1)]
        );
    }

    #[test]
    fn test_statements_on_consecutive_lines_after_multiline() {
        let text = "UPDATE users\nSET name = 'Bob'\nWHERE id = 4;\nDELETE FROM users WHERE id = 2;";
        assert_eq!(
            split_statements(SqlType::Postgres, text),
            vec![
                segment("UPDATE users\nSET name = 'Bob'\nWHERE id = 4", 1),
                segment("DELETE FROM users WHERE id = 2", 4),
            ]
        );
    }
}
