use airiss_core::ingest;
use axum::{
    body::Bytes,
    extract::{multipart::{MultipartError, MultipartRejection}, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::models::dataset::{DatasetRecord, NewDataset};
use crate::models::ids::DatasetId;
use crate::state::AppState;

#[derive(Serialize)]
pub struct DatasetSummary {
    pub dataset_id: DatasetId,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub record_count: usize,
    pub field_names: Vec<String>,
    pub comment_fields: Vec<String>,
    pub message: String,
}

impl From<&DatasetRecord> for DatasetSummary {
    fn from(record: &DatasetRecord) -> Self {
        DatasetSummary {
            dataset_id: record.id,
            file_name: record.source_name.clone(),
            uploaded_at: record.uploaded_at,
            record_count: record.record_count,
            field_names: record.field_names.clone(),
            comment_fields: record.comment_fields.clone(),
            message: format!(
                "found {} employee records ({} comment columns)",
                record.record_count,
                record.comment_fields.len()
            ),
        }
    }
}

/// POST /upload: multipart field `file` holding a .xlsx, .xls or .csv file.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DatasetSummary>, ApiError> {
    let mut multipart = multipart?;
    let (file_name, bytes) = read_file_field(&mut multipart).await?;
    info!(%file_name, bytes = bytes.len(), "upload received");

    // Parsing is CPU-bound; keep it off the async workers.
    let name = file_name.clone();
    let table = tokio::task::spawn_blocking(move || ingest::parse_upload(&name, &bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("upload parser task failed: {e}")))??;

    let record = state.registry.create_dataset(NewDataset {
        source_name: file_name,
        table,
    });
    Ok(Json(DatasetSummary::from(record.as_ref())))
}

/// GET /datasets/{dataset_id}
pub async fn get_dataset(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
) -> Result<Json<DatasetSummary>, ApiError> {
    let record = DatasetId::parse(&dataset_id)
        .and_then(|id| state.registry.get_dataset(&id))
        .ok_or_else(|| ApiError::dataset_not_found(dataset_id))?;
    Ok(Json(DatasetSummary::from(record.as_ref())))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidRequest("uploaded file has no file name".into()))?;
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok((file_name, bytes));
    }
    Err(ApiError::InvalidRequest(
        "multipart field 'file' is missing".into(),
    ))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::InvalidRequest(err.body_text())
    }
}
