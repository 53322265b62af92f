// service/sweeper.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    service::{
        error::ServiceError, reservation_service::ReservationService,
        workproof_service::WorkProofService,
    },
    utils::clock::Clock,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReservationSweep {
    pub expired: u64,
    pub violations_recorded: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub ran_at: DateTime<Utc>,
    pub reservations_expired: u64,
    pub violations_recorded: u64,
    pub work_proofs_transitioned: u64,
    /// Sweeps that failed and will be retried on the next tick
    pub failed: Vec<&'static str>,
}

/// Drives reservations and work proofs past their deadlines through the
/// same service calls every other caller uses.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    reservations: Arc<ReservationService>,
    work_proofs: Arc<WorkProofService>,
    clock: Arc<dyn Clock>,
}

impl ExpirySweeper {
    pub fn new(
        reservations: Arc<ReservationService>,
        work_proofs: Arc<WorkProofService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reservations,
            work_proofs,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn sweep_reservations(&self, now: DateTime<Utc>) -> Result<ReservationSweep, ServiceError> {
        let expired = self.reservations.sweep_expired(now).await?;

        let violations_recorded = if expired > 0 {
            match self.reservations.record_violations(now).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!("Failed to record reservation violations: {}", e);
                    0
                }
            }
        } else {
            0
        };

        tracing::info!(
            "Reservation sweep: {} expired, {} violations recorded",
            expired,
            violations_recorded
        );

        Ok(ReservationSweep {
            expired,
            violations_recorded,
        })
    }

    pub async fn sweep_work_proofs(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        let transitioned = self.work_proofs.sweep_deadlines(now).await?;
        tracing::info!("Work proof sweep: {} proofs transitioned", transitioned);
        Ok(transitioned)
    }

    /// Both sweeps at the current time. A failing sweep is logged and
    /// reported; the other still runs.
    pub async fn run_once(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport {
            ran_at: now,
            reservations_expired: 0,
            violations_recorded: 0,
            work_proofs_transitioned: 0,
            failed: Vec::new(),
        };

        match self.sweep_reservations(now).await {
            Ok(sweep) => {
                report.reservations_expired = sweep.expired;
                report.violations_recorded = sweep.violations_recorded;
            }
            Err(e) => {
                tracing::error!("Reservation sweep failed: {}", e);
                report.failed.push("reservations");
            }
        }

        match self.sweep_work_proofs(now).await {
            Ok(count) => report.work_proofs_transitioned = count,
            Err(e) => {
                tracing::error!("Work proof sweep failed: {}", e);
                report.failed.push("work_proofs");
            }
        }

        report
    }

    pub async fn purge_old_violations(&self) -> Result<u64, ServiceError> {
        let purged = self.reservations.purge_old_violations(self.clock.now()).await?;
        tracing::info!("Purged {} old reservation violations", purged);
        Ok(purged)
    }
}
