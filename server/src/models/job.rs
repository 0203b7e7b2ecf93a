use std::fmt;
use std::num::NonZeroUsize;

use airiss_core::{AnalysisMode, ResultItem};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::{DatasetId, JobId};
use crate::registry::RegistryError;

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Transition table. Staying in the same state is handled by the caller.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::{Cancelled, Completed, Failed, Pending, Processing};
        matches!(
            (self, next),
            (Pending, Processing | Failed | Cancelled) | (Processing, Completed | Failed | Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of an analysis request, validated.
#[derive(Debug, Clone, Copy)]
pub struct JobParams {
    pub sample_size: NonZeroUsize,
    pub mode: AnalysisMode,
    pub ai_feedback: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    pub dataset_id: DatasetId,
    pub status: JobStatus,
    pub requested_sample_size: usize,
    pub mode: AnalysisMode,
    pub ai_feedback_enabled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_units: usize,
    pub processed_units: usize,
    pub result_items: Vec<ResultItem>,
    pub error: Option<String>,
}

impl JobRecord {
    pub fn new(id: JobId, dataset_id: DatasetId, params: JobParams, total_units: usize) -> Self {
        Self {
            id,
            dataset_id,
            status: JobStatus::Pending,
            requested_sample_size: params.sample_size.get(),
            mode: params.mode,
            ai_feedback_enabled: params.ai_feedback,
            started_at: Utc::now(),
            finished_at: None,
            total_units,
            processed_units: 0,
            result_items: Vec::new(),
            error: None,
        }
    }

    /// Percent done, rounded to one decimal. Zero when there is nothing to do.
    pub fn progress_percent(&self) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        let pct = self.processed_units as f64 / self.total_units as f64 * 100.0;
        (pct * 10.0).round() / 10.0
    }

    /// Merges `update` into the record. Either every field is applied or, on
    /// error, none is.
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), RegistryError> {
        if self.status.is_terminal() {
            return Err(RegistryError::JobClosed {
                id: self.id,
                status: self.status,
            });
        }

        let status = match update.status {
            Some(next) if next != self.status && !self.status.can_transition_to(next) => {
                return Err(RegistryError::InvalidTransition {
                    id: self.id,
                    from: self.status,
                    to: next,
                });
            }
            Some(next) => next,
            None => self.status,
        };

        let total = update.total_units.unwrap_or(self.total_units);
        let base = update.processed_units.unwrap_or(self.processed_units);
        let processed = base.saturating_add(update.advance_units);
        if processed > total {
            return Err(RegistryError::ProgressOutOfRange {
                id: self.id,
                processed,
                total,
            });
        }
        let results = self.result_items.len() + update.append_results.len();
        if processed != results {
            return Err(RegistryError::ResultCountMismatch {
                id: self.id,
                processed,
                results,
            });
        }
        if status == JobStatus::Completed && processed != total {
            return Err(RegistryError::Incomplete {
                id: self.id,
                processed,
                total,
            });
        }

        self.status = status;
        self.total_units = total;
        self.processed_units = processed;
        self.result_items.extend(update.append_results);
        if update.error.is_some() {
            self.error = update.error;
        }
        if status.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// Partial update of a [`JobRecord`]. `None` / empty fields are left alone;
/// `processed_units` is applied before `advance_units` is added. The counter
/// must land on the number of stored results, so units and results move
/// together.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub total_units: Option<usize>,
    pub processed_units: Option<usize>,
    pub advance_units: usize,
    pub append_results: Vec<ResultItem>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// One more unit done, with its result.
    pub fn progress(item: ResultItem) -> Self {
        Self {
            advance_units: 1,
            append_results: vec![item],
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
