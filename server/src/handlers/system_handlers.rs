use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub datasets: usize,
    pub jobs: usize,
    pub message: &'static str,
}

pub async fn main_page() -> Json<Value> {
    Json(json!({ "message": "Welcome to AIRISS, the AI talent analysis service" }))
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        datasets: state.registry.dataset_count(),
        jobs: state.registry.job_count(),
        message: "AIRISS is up and running",
    })
}
