use std::num::NonZeroUsize;

use airiss_core::{report, AnalysisMode, Analyzer};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::models::ids::{DatasetId, JobId};
use crate::models::job::{JobParams, JobRecord, JobStatus};
use crate::state::AppState;
use crate::worker;

fn default_sample_size() -> usize {
    25
}

#[derive(Deserialize)]
pub struct AnalysisRequest {
    #[serde(alias = "file_id")]
    pub dataset_id: String,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Parsed case-insensitively; defaults to hybrid.
    #[serde(default)]
    pub analysis_mode: Option<String>,
    #[serde(default)]
    pub enable_ai_feedback: bool,
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

#[derive(Serialize)]
pub struct JobCreated {
    pub job_id: JobId,
    pub message: String,
}

#[derive(Serialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub mode: AnalysisMode,
    pub ai_feedback: bool,
    pub requested_sample_size: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub progress_percent: f64,
    pub processed_units: usize,
    pub total_units: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&JobRecord> for JobStatusResponse {
    fn from(job: &JobRecord) -> Self {
        JobStatusResponse {
            job_id: job.id,
            status: job.status,
            mode: job.mode,
            ai_feedback: job.ai_feedback_enabled,
            requested_sample_size: job.requested_sample_size,
            started_at: job.started_at,
            finished_at: job.finished_at,
            progress_percent: job.progress_percent(),
            processed_units: job.processed_units,
            total_units: job.total_units,
            message: format!(
                "{}/{} employees analyzed",
                job.processed_units, job.total_units
            ),
            error: job.error.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct JobCancelled {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// POST /analyze: creates the job and starts its worker; answers 202.
pub async fn start_analysis(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let sample_size = NonZeroUsize::new(payload.sample_size)
        .ok_or_else(|| ApiError::InvalidRequest("sample_size must be at least 1".into()))?;
    let mode = match payload.analysis_mode.as_deref() {
        Some(raw) => raw.parse::<AnalysisMode>()?,
        None => AnalysisMode::default(),
    };
    let dataset_id = DatasetId::parse(&payload.dataset_id)
        .ok_or_else(|| ApiError::DatasetNotFound(payload.dataset_id.clone()))?;

    // Resolve the provider first so a bad key never leaves a dangling job.
    let feedback = if payload.enable_ai_feedback {
        let api_key = payload
            .openai_api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| state.config.openai_api_key.clone())
            .ok_or_else(|| {
                ApiError::InvalidRequest(
                    "AI feedback needs openai_api_key in the request or OPENAI_API_KEY on the server"
                        .into(),
                )
            })?;
        Some((state.feedback)(api_key)?)
    } else {
        None
    };

    let params = JobParams {
        sample_size,
        mode,
        ai_feedback: feedback.is_some(),
    };
    let job_id = state.registry.create_job(dataset_id, params)?;
    worker::spawn_analysis(
        state.registry.clone(),
        job_id,
        feedback,
        state.config.analysis_concurrency,
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(JobCreated {
            job_id,
            message: "analysis started; poll /status for progress".to_string(),
        }),
    ))
}

/// GET /status/{job_id}
pub async fn check_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job = find_job(&state, &job_id)?;
    Ok(Json(JobStatusResponse::from(&job)))
}

/// POST /cancel/{job_id}
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobCancelled>, ApiError> {
    let id = JobId::parse(&job_id).ok_or_else(|| ApiError::job_not_found(job_id))?;
    state.registry.cancel_job(id)?;
    Ok(Json(JobCancelled {
        job_id: id,
        status: JobStatus::Cancelled,
    }))
}

/// GET /download/{job_id}: CSV of the results once the job has completed.
pub async fn download_results(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = find_job(&state, &job_id)?;
    if job.status != JobStatus::Completed {
        return Err(ApiError::NotReady {
            id: job.id.to_string(),
            status: job.status,
        });
    }

    // Columns come from the dataset so an empty result still gets a full header.
    let dataset = state
        .registry
        .get_dataset(&job.dataset_id)
        .ok_or_else(|| ApiError::Internal(format!("dataset of job {} is gone", job.id)))?;
    let field_names = Analyzer::new(&dataset.table, job.mode).field_names();
    let csv = report::render_csv(&field_names, &job.result_items)?;
    info!(job_id = %job.id, items = job.result_items.len(), "results downloaded");

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"AIRISS_results_{}.csv\"", job.id),
        ),
    ];
    Ok((headers, csv))
}

fn find_job(state: &AppState, raw_id: &str) -> Result<JobRecord, ApiError> {
    JobId::parse(raw_id)
        .and_then(|id| state.registry.get_job(&id))
        .ok_or_else(|| ApiError::job_not_found(raw_id))
}
