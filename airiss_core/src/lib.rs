pub mod ai;
pub mod analysis;
pub mod error;
pub mod ingest;
pub mod report;

use serde::{Deserialize, Serialize};

pub use analysis::{AnalysisMode, Analyzer, FeedbackProvider, FieldValue, ResultItem};
pub use error::CoreError;

/// Column-name fragments that mark a free-text evaluation column.
pub const COMMENT_KEYWORDS: [&str; 4] = ["의견", "opinion", "평가", "feedback"];

/// Case-insensitive substring match against [`COMMENT_KEYWORDS`].
pub fn is_comment_field(name: &str) -> bool {
    let lower = name.to_lowercase();
    COMMENT_KEYWORDS.iter().any(|word| lower.contains(word))
}

/// A parsed upload: one header row and the data rows below it.
///
/// Every row has exactly `headers.len()` cells; short rows are padded with
/// empty strings during ingest.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn record_count(&self) -> usize {
        self.rows.len()
    }

    /// Headers that look like evaluation comments, in header order.
    pub fn comment_fields(&self) -> Vec<String> {
        self.headers
            .iter()
            .filter(|h| is_comment_field(h))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_fields_match_keywords_case_insensitively() {
        let table = Table::new(
            vec![
                "name".into(),
                "Opinion".into(),
                "Manager FEEDBACK".into(),
                "score".into(),
                "상사 평가".into(),
            ],
            Vec::new(),
        );
        assert_eq!(
            table.comment_fields(),
            vec!["Opinion", "Manager FEEDBACK", "상사 평가"]
        );
    }

    #[test]
    fn plain_columns_are_not_comments() {
        assert!(!is_comment_field("employee_id"));
        assert!(!is_comment_field(""));
        assert!(is_comment_field("종합의견"));
    }
}
