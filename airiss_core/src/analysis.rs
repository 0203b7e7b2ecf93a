//! Per-row analysis.
//!
//! The scoring model lives outside this repository. What is here selects the
//! columns a job looks at, gathers the evaluation comments for each sampled
//! row, and optionally asks a [`FeedbackProvider`] to comment on them.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{is_comment_field, CoreError, Table};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Comment columns only.
    Text,
    /// Every column that is not a comment column.
    Quantitative,
    #[default]
    Hybrid,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Text => "text",
            AnalysisMode::Quantitative => "quantitative",
            AnalysisMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(AnalysisMode::Text),
            "quantitative" => Ok(AnalysisMode::Quantitative),
            "hybrid" => Ok(AnalysisMode::Hybrid),
            other => Err(CoreError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    pub value: String,
}

/// One analyzed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    /// Zero-based position of the row in the uploaded table.
    pub row_index: usize,
    /// The row's first column, usually the employee name or number.
    pub subject: String,
    pub fields: Vec<FieldValue>,
    pub ai_feedback: Option<String>,
}

/// Produces written feedback for one employee's evaluation comments.
#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    async fn feedback(&self, subject: &str, comments: &str) -> Result<String, CoreError>;
}

/// Analyzes rows of one table with a fixed column selection.
pub struct Analyzer {
    headers: Vec<String>,
    fields: Vec<usize>,
    comments: Vec<usize>,
    feedback: Option<Arc<dyn FeedbackProvider>>,
}

impl Analyzer {
    pub fn new(table: &Table, mode: AnalysisMode) -> Self {
        let is_comment: Vec<bool> = table.headers.iter().map(|h| is_comment_field(h)).collect();
        let fields = (0..table.headers.len())
            .filter(|&idx| match mode {
                AnalysisMode::Text => is_comment[idx],
                AnalysisMode::Quantitative => !is_comment[idx],
                AnalysisMode::Hybrid => true,
            })
            .collect();
        let comments = (0..table.headers.len()).filter(|&idx| is_comment[idx]).collect();

        Self {
            headers: table.headers.clone(),
            fields,
            comments,
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, provider: Arc<dyn FeedbackProvider>) -> Self {
        self.feedback = Some(provider);
        self
    }

    /// Names of the columns each [`ResultItem`] carries, in order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|&idx| self.headers[idx].clone()).collect()
    }

    pub async fn analyze_row(&self, row_index: usize, row: &[String]) -> Result<ResultItem, CoreError> {
        let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");

        let fields = self
            .fields
            .iter()
            .map(|&idx| FieldValue {
                name: self.headers[idx].clone(),
                value: cell(idx).to_string(),
            })
            .collect();
        let subject = cell(0).to_string();

        let ai_feedback = match &self.feedback {
            Some(provider) => {
                let comments = self.comment_text(row);
                if comments.is_empty() {
                    None
                } else {
                    Some(provider.feedback(&subject, &comments).await?)
                }
            }
            None => None,
        };

        Ok(ResultItem {
            row_index,
            subject,
            fields,
            ai_feedback,
        })
    }

    /// Non-empty comment cells as `column: text` lines.
    fn comment_text(&self, row: &[String]) -> String {
        self.comments
            .iter()
            .filter_map(|&idx| {
                let text = row.get(idx)?.trim();
                (!text.is_empty()).then(|| format!("{}: {}", self.headers[idx], text))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            vec!["name".into(), "score".into(), "opinion".into()],
            vec![
                vec!["Kim".into(), "92".into(), "Leads the team well".into()],
                vec!["Lee".into(), "71".into(), String::new()],
            ],
        )
    }

    struct Echo;

    #[async_trait]
    impl FeedbackProvider for Echo {
        async fn feedback(&self, subject: &str, comments: &str) -> Result<String, CoreError> {
            Ok(format!("{subject} => {comments}"))
        }
    }

    #[test]
    fn mode_selects_columns() {
        let t = table();
        assert_eq!(Analyzer::new(&t, AnalysisMode::Text).field_names(), vec!["opinion"]);
        assert_eq!(
            Analyzer::new(&t, AnalysisMode::Quantitative).field_names(),
            vec!["name", "score"]
        );
        assert_eq!(Analyzer::new(&t, AnalysisMode::Hybrid).field_names().len(), 3);
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("Hybrid".parse::<AnalysisMode>().unwrap(), AnalysisMode::Hybrid);
        assert_eq!(" text ".parse::<AnalysisMode>().unwrap(), AnalysisMode::Text);
        assert!("deep".parse::<AnalysisMode>().is_err());
        assert_eq!(AnalysisMode::default().to_string(), "hybrid");
    }

    #[tokio::test]
    async fn analyze_row_without_feedback() {
        let t = table();
        let analyzer = Analyzer::new(&t, AnalysisMode::Text);
        let item = analyzer.analyze_row(0, &t.rows[0]).await.unwrap();
        assert_eq!(item.row_index, 0);
        assert_eq!(item.subject, "Kim");
        assert_eq!(
            item.fields,
            vec![FieldValue {
                name: "opinion".into(),
                value: "Leads the team well".into()
            }]
        );
        assert_eq!(item.ai_feedback, None);
    }

    #[tokio::test]
    async fn feedback_skips_rows_without_comments() {
        let t = table();
        let analyzer = Analyzer::new(&t, AnalysisMode::Hybrid).with_feedback(Arc::new(Echo));

        let first = analyzer.analyze_row(0, &t.rows[0]).await.unwrap();
        assert_eq!(
            first.ai_feedback.as_deref(),
            Some("Kim => opinion: Leads the team well")
        );

        let second = analyzer.analyze_row(1, &t.rows[1]).await.unwrap();
        assert_eq!(second.ai_feedback, None);
    }
}
