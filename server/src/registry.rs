//! In-memory authority for dataset and job records.
//!
//! Both maps are sharded concurrent maps. A job update runs entirely under
//! that entry's write guard, so readers never see a result appended without
//! its counter moving (or the reverse).

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::dataset::{DatasetRecord, NewDataset};
use crate::models::ids::{DatasetId, JobId};
use crate::models::job::{JobParams, JobRecord, JobStatus, JobUpdate};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("dataset {0} not found")]
    DatasetNotFound(DatasetId),

    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("job {id} is already {status}")]
    JobClosed { id: JobId, status: JobStatus },

    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("job {id}: {processed} processed units would exceed the total of {total}")]
    ProgressOutOfRange {
        id: JobId,
        processed: usize,
        total: usize,
    },

    #[error("job {id}: {processed} processed units but {results} stored results")]
    ResultCountMismatch {
        id: JobId,
        processed: usize,
        results: usize,
    },

    #[error("job {id} cannot complete with {processed} of {total} units processed")]
    Incomplete {
        id: JobId,
        processed: usize,
        total: usize,
    },
}

/// Cheap to clone; clones share the same storage.
#[derive(Clone, Default, Debug)]
pub struct Registry {
    datasets: Arc<DashMap<DatasetId, Arc<DatasetRecord>>>,
    jobs: Arc<DashMap<JobId, JobRecord>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an upload under a freshly drawn id and returns the stored record.
    pub fn create_dataset(&self, upload: NewDataset) -> Arc<DatasetRecord> {
        loop {
            let id = DatasetId::new();
            if let Entry::Vacant(slot) = self.datasets.entry(id) {
                let record = Arc::new(DatasetRecord::new(id, upload));
                slot.insert(Arc::clone(&record));
                info!(
                    dataset_id = %id,
                    source = %record.source_name,
                    records = record.record_count,
                    "dataset registered"
                );
                return record;
            }
        }
    }

    pub fn get_dataset(&self, id: &DatasetId) -> Option<Arc<DatasetRecord>> {
        self.datasets.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Creates a `pending` job over an existing dataset. Its total is the
    /// requested sample size, capped at the dataset's record count.
    pub fn create_job(&self, dataset_id: DatasetId, params: JobParams) -> Result<JobId, RegistryError> {
        let dataset = self
            .get_dataset(&dataset_id)
            .ok_or(RegistryError::DatasetNotFound(dataset_id))?;
        let total = params.sample_size.get().min(dataset.record_count);

        loop {
            let id = JobId::new();
            if let Entry::Vacant(slot) = self.jobs.entry(id) {
                slot.insert(JobRecord::new(id, dataset_id, params, total));
                info!(
                    job_id = %id,
                    %dataset_id,
                    total,
                    mode = %params.mode,
                    ai_feedback = params.ai_feedback,
                    "job created"
                );
                return Ok(id);
            }
        }
    }

    /// Snapshot of the job as of this call.
    pub fn get_job(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs.get(id).map(|r| r.value().clone())
    }

    /// Applies `update` atomically. Unknown ids are an error, not a no-op.
    pub fn update_job(&self, id: JobId, update: JobUpdate) -> Result<(), RegistryError> {
        let mut entry = self
            .jobs
            .get_mut(&id)
            .ok_or(RegistryError::JobNotFound(id))?;
        let from = entry.status;
        entry.apply(update)?;
        if entry.status != from {
            debug!(job_id = %id, %from, to = %entry.status, "job status changed");
        }
        Ok(())
    }

    pub fn cancel_job(&self, id: JobId) -> Result<(), RegistryError> {
        self.update_job(id, JobUpdate::status(JobStatus::Cancelled))?;
        info!(job_id = %id, "job cancelled");
        Ok(())
    }

    pub fn dataset_count(&self) -> usize {
        self.datasets.len()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}
