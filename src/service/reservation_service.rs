// service/reservation_service.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{
        reservationdb::{NewReservation, ReservationExt},
        LedgerStore,
    },
    models::reservationmodel::{
        JobReservation, ReservationViolation, ReservationWithJob, VIOLATION_EXPIRY_THRESHOLD,
        VIOLATION_RETENTION_DAYS, VIOLATION_WINDOW_HOURS,
    },
    service::{error::ServiceError, settings_service::SettingsService},
    utils::clock::Clock,
};

#[derive(Debug, Clone)]
pub struct ReservationService {
    store: Arc<dyn LedgerStore>,
    settings: Arc<SettingsService>,
    clock: Arc<dyn Clock>,
}

impl ReservationService {
    pub fn new(store: Arc<dyn LedgerStore>, settings: Arc<SettingsService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            settings,
            clock,
        }
    }

    /// `duration_minutes <= 0` uses the configured default
    pub async fn create_reservation(
        &self,
        job_id: Uuid,
        user_id: Uuid,
        duration_minutes: i64,
    ) -> Result<JobReservation, ServiceError> {
        let settings = self.settings.snapshot().await?;
        let policy = &settings.reservation;

        if !policy.is_enabled {
            return Err(ServiceError::Validation(
                "Job reservations are currently disabled".to_string(),
            ));
        }

        let minutes = if duration_minutes <= 0 {
            policy.default_reservation_minutes
        } else {
            duration_minutes
        };

        let now = self.clock.now();
        let expires_at = Duration::try_minutes(minutes)
            .and_then(|hold| now.checked_add_signed(hold))
            .ok_or_else(|| {
                ServiceError::Validation("Reservation duration is too long".to_string())
            })?;

        let reservation = self
            .store
            .create_reservation(
                NewReservation {
                    job_id,
                    user_id,
                    expires_at,
                },
                now,
                policy.max_reservations_per_user,
            )
            .await?;

        tracing::info!(
            "User {} reserved job {} until {}",
            user_id,
            job_id,
            reservation.expires_at
        );

        Ok(reservation)
    }

    pub async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        user_id: Uuid,
    ) -> Result<JobReservation, ServiceError> {
        self.store
            .cancel_reservation(reservation_id, user_id, self.clock.now())
            .await?
            .ok_or_else(|| ServiceError::not_found("Active reservation"))
    }

    pub async fn list_active_reservations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReservationWithJob>, ServiceError> {
        self.store.get_active_reservations(user_id, self.clock.now()).await
    }

    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        self.store.expire_reservations(now).await
    }

    pub async fn record_violations(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        self.store
            .record_expiry_violations(
                now - Duration::hours(VIOLATION_WINDOW_HOURS),
                VIOLATION_EXPIRY_THRESHOLD,
                now,
            )
            .await
    }

    pub async fn list_violations(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReservationViolation>, i64), ServiceError> {
        self.store.get_reservation_violations(limit, offset).await
    }

    pub async fn purge_old_violations(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        self.store
            .purge_reservation_violations(now - Duration::days(VIOLATION_RETENTION_DAYS))
            .await
    }
}
