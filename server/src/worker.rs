//! Background analysis: one task per job.
//!
//! Rows are analyzed with bounded concurrency but results are appended in row
//! order. The task stops as soon as the registry reports the job closed, which
//! is how cancellation reaches it.

use std::sync::Arc;

use airiss_core::{Analyzer, CoreError, FeedbackProvider};
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::models::ids::JobId;
use crate::models::job::{JobStatus, JobUpdate};
use crate::registry::{Registry, RegistryError};

#[derive(Debug, Error)]
enum WorkerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Analysis(#[from] CoreError),
}

pub fn spawn_analysis(
    registry: Registry,
    job_id: JobId,
    feedback: Option<Arc<dyn FeedbackProvider>>,
    concurrency: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match run_analysis(&registry, job_id, feedback, concurrency).await {
            Ok(()) => info!(%job_id, "analysis completed"),
            Err(WorkerError::Registry(RegistryError::JobClosed { status, .. })) => {
                info!(%job_id, %status, "job closed while running, stopping");
            }
            Err(err) => {
                error!(%job_id, error = %err, "analysis failed");
                if let Err(e) = registry.update_job(job_id, JobUpdate::failed(err.to_string())) {
                    warn!(%job_id, error = %e, "could not mark job failed");
                }
            }
        }
    })
}

async fn run_analysis(
    registry: &Registry,
    job_id: JobId,
    feedback: Option<Arc<dyn FeedbackProvider>>,
    concurrency: usize,
) -> Result<(), WorkerError> {
    let job = registry
        .get_job(&job_id)
        .ok_or(RegistryError::JobNotFound(job_id))?;
    let dataset = registry
        .get_dataset(&job.dataset_id)
        .ok_or(RegistryError::DatasetNotFound(job.dataset_id))?;

    registry.update_job(job_id, JobUpdate::status(JobStatus::Processing))?;
    info!(%job_id, total = job.total_units, "analysis started");

    let mut analyzer = Analyzer::new(&dataset.table, job.mode);
    if let Some(provider) = feedback {
        analyzer = analyzer.with_feedback(provider);
    }
    let analyzer = &analyzer;
    let rows = &dataset.table.rows;

    let mut results = stream::iter(0..job.total_units)
        .map(move |idx| analyzer.analyze_row(idx, &rows[idx]))
        .buffered(concurrency.max(1));

    while let Some(item) = results.next().await {
        registry.update_job(job_id, JobUpdate::progress(item?))?;
    }

    registry.update_job(job_id, JobUpdate::status(JobStatus::Completed))?;
    Ok(())
}
