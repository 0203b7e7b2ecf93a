use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::analysis_handlers::{cancel_job, check_status, download_results, start_analysis};
use crate::handlers::system_handlers::{health_check, main_page};
use crate::handlers::upload_handlers::{get_dataset, upload_file};
use crate::state::AppState;

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(main_page))
        .route("/health", get(health_check))
        .route("/upload", post(upload_file))
        .route("/datasets/{dataset_id}", get(get_dataset))
        .route("/analyze", post(start_analysis))
        .route("/status/{job_id}", get(check_status))
        .route("/cancel/{job_id}", post(cancel_job))
        .route("/download/{job_id}", get(download_results))
        .with_state(state)
}
