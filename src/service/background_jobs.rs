// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::AppState;

const VIOLATION_CLEANUP_INTERVAL_SECS: u64 = 86_400; // daily

/// Expire lapsed reservations and flag repeat offenders
pub async fn start_reservation_expiry_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(app_state.env.reservation_sweep_interval_secs));

    loop {
        interval.tick().await;

        tracing::info!("Running reservation expiry job at {}", Utc::now());

        let now = app_state.sweeper.now();
        if let Err(e) = app_state.sweeper.sweep_reservations(now).await {
            tracing::error!("Reservation expiry job failed: {}", e);
        }
    }
}

/// Auto-approve overdue reviews and close elapsed response windows
pub async fn start_work_proof_timeout_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(app_state.env.work_proof_sweep_interval_secs));

    loop {
        interval.tick().await;

        tracing::info!("Running work proof timeout job at {}", Utc::now());

        let now = app_state.sweeper.now();
        if let Err(e) = app_state.sweeper.sweep_work_proofs(now).await {
            tracing::error!("Work proof timeout job failed: {}", e);
        }
    }
}

/// Drop reservation violations past their retention period
pub async fn start_violation_cleanup_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(VIOLATION_CLEANUP_INTERVAL_SECS));

    loop {
        interval.tick().await;

        tracing::info!("Running reservation violation cleanup at {}", Utc::now());

        if let Err(e) = app_state.sweeper.purge_old_violations().await {
            tracing::error!("Reservation violation cleanup failed: {}", e);
        }
    }
}
