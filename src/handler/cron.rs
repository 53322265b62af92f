// handler/cron.rs
use std::sync::Arc;

use axum::{middleware, response::IntoResponse, routing::post, Extension, Json, Router};
use serde_json::json;

use crate::{
    dtos::{admindtos::CronTriggerDto, ApiResponse},
    error::HttpError,
    middleware::cron_auth,
    AppState,
};

pub const EXPIRE_RESERVATIONS_JOB: &str = "expire-reservations";
pub const WORK_PROOF_TIMEOUTS_JOB: &str = "process-work-proof-timeouts";

pub fn cron_handler() -> Router {
    Router::new()
        .route("/expire-reservations", post(expire_reservations))
        .route("/process-work-proof-timeouts", post(process_work_proof_timeouts))
        .route("/trigger", post(trigger_job))
        .layer(middleware::from_fn(cron_auth))
}

async fn run_reservation_sweep(app_state: &AppState) -> Result<serde_json::Value, HttpError> {
    let now = app_state.sweeper.now();
    let sweep = app_state.sweeper.sweep_reservations(now).await?;

    Ok(json!({
        "expiredCount": sweep.expired,
        "violationsRecorded": sweep.violations_recorded,
        "timestamp": now,
    }))
}

async fn run_work_proof_sweep(app_state: &AppState) -> Result<serde_json::Value, HttpError> {
    let now = app_state.sweeper.now();
    let transitioned = app_state.sweeper.sweep_work_proofs(now).await?;

    Ok(json!({
        "processedCount": transitioned,
        "timestamp": now,
    }))
}

pub async fn expire_reservations(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let data = run_reservation_sweep(&app_state).await?;

    Ok(Json(ApiResponse::success("Expired reservations processed", data)))
}

pub async fn process_work_proof_timeouts(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let data = run_work_proof_sweep(&app_state).await?;

    Ok(Json(ApiResponse::success("Work proof timeouts processed", data)))
}

pub async fn trigger_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<CronTriggerDto>,
) -> Result<impl IntoResponse, HttpError> {
    tracing::info!("Cron trigger received for {}", body.job_type);

    let data = match body.job_type.as_str() {
        EXPIRE_RESERVATIONS_JOB => run_reservation_sweep(&app_state).await?,
        WORK_PROOF_TIMEOUTS_JOB => run_work_proof_sweep(&app_state).await?,
        other => {
            return Err(HttpError::bad_request(format!(
                "Unknown job type: {}. Expected {} or {}",
                other, EXPIRE_RESERVATIONS_JOB, WORK_PROOF_TIMEOUTS_JOB
            )))
        }
    };

    Ok(Json(ApiResponse::success("Job executed", data)))
}
