// db/reservationdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::db::DBClient;
use crate::{
    models::reservationmodel::{
        JobReservation, ReservationStatus, ReservationViolation, ReservationWithJob,
        REPEATED_EXPIRY_VIOLATION,
    },
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait ReservationExt: Send + Sync {
    /// Insert an active hold after checking, under a per-user lock, that the
    /// user has no live hold on the job and fewer than `max_active` live
    /// holds overall.
    async fn create_reservation(
        &self,
        reservation: NewReservation,
        now: DateTime<Utc>,
        max_active: i64,
    ) -> Result<JobReservation, ServiceError>;

    /// `None` when the hold does not exist, belongs to someone else or is
    /// no longer live.
    async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<JobReservation>, ServiceError>;

    async fn get_active_reservations(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservationWithJob>, ServiceError>;

    async fn expire_reservations(&self, now: DateTime<Utc>) -> Result<u64, ServiceError>;

    /// Flag users with at least `threshold` holds expired since
    /// `window_start` and no violation recorded in that window.
    async fn record_expiry_violations(
        &self,
        window_start: DateTime<Utc>,
        threshold: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError>;

    async fn get_reservation_violations(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReservationViolation>, i64), ServiceError>;

    async fn purge_reservation_violations(&self, before: DateTime<Utc>) -> Result<u64, ServiceError>;
}

const RESERVATION_COLUMNS: &str = "id, job_id, user_id, status, expires_at, created_at, updated_at";

#[async_trait]
impl ReservationExt for DBClient {
    async fn create_reservation(
        &self,
        reservation: NewReservation,
        now: DateTime<Utc>,
        max_active: i64,
    ) -> Result<JobReservation, ServiceError> {
        let mut tx = self.pool.begin().await?;

        // Serializes creations per user; different users never wait on each other
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(reservation.user_id.to_string())
            .execute(&mut *tx)
            .await?;

        let duplicate: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM job_reservations
            WHERE job_id = $1 AND user_id = $2 AND status = $3 AND expires_at > $4
            LIMIT 1
            "#,
        )
        .bind(reservation.job_id)
        .bind(reservation.user_id)
        .bind(ReservationStatus::Active)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        if duplicate.is_some() {
            return Err(ServiceError::DuplicateReservation {
                job_id: reservation.job_id,
            });
        }

        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM job_reservations
            WHERE user_id = $1 AND status = $2 AND expires_at > $3
            "#,
        )
        .bind(reservation.user_id)
        .bind(ReservationStatus::Active)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if active >= max_active {
            return Err(ServiceError::ReservationLimitExceeded { limit: max_active });
        }

        let created = sqlx::query_as::<_, JobReservation>(&format!(
            r#"
            INSERT INTO job_reservations (id, job_id, user_id, status, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(reservation.job_id)
        .bind(reservation.user_id)
        .bind(ReservationStatus::Active)
        .bind(reservation.expires_at)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<JobReservation>, ServiceError> {
        let cancelled = sqlx::query_as::<_, JobReservation>(&format!(
            r#"
            UPDATE job_reservations
            SET status = $3, updated_at = $4
            WHERE id = $1 AND user_id = $2 AND status = $5 AND expires_at > $4
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .bind(user_id)
        .bind(ReservationStatus::Cancelled)
        .bind(now)
        .bind(ReservationStatus::Active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cancelled)
    }

    async fn get_active_reservations(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservationWithJob>, ServiceError> {
        let reservations = sqlx::query_as::<_, ReservationWithJob>(
            r#"
            SELECT jr.id, jr.job_id, jr.user_id, jr.status, jr.expires_at, jr.created_at, jr.updated_at,
                   j.title AS job_title, j.budget AS job_budget
            FROM job_reservations jr
            LEFT JOIN jobs j ON j.id = jr.job_id
            WHERE jr.user_id = $1 AND jr.status = $2 AND jr.expires_at > $3
            ORDER BY jr.expires_at ASC
            "#,
        )
        .bind(user_id)
        .bind(ReservationStatus::Active)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(reservations)
    }

    async fn expire_reservations(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE job_reservations
            SET status = $1, updated_at = $2
            WHERE status = $3 AND expires_at <= $2
            "#,
        )
        .bind(ReservationStatus::Expired)
        .bind(now)
        .bind(ReservationStatus::Active)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn record_expiry_violations(
        &self,
        window_start: DateTime<Utc>,
        threshold: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError> {
        let result = sqlx::query(
            r#"
            INSERT INTO reservation_violations (id, user_id, violation_type, expired_count, window_start, created_at)
            SELECT gen_random_uuid(), jr.user_id, $4, COUNT(*), $1, $3
            FROM job_reservations jr
            WHERE jr.status = $5
              AND jr.updated_at >= $1
              AND NOT EXISTS (
                  SELECT 1 FROM reservation_violations rv
                  WHERE rv.user_id = jr.user_id AND rv.created_at >= $1
              )
            GROUP BY jr.user_id
            HAVING COUNT(*) >= $2
            "#,
        )
        .bind(window_start)
        .bind(threshold)
        .bind(now)
        .bind(REPEATED_EXPIRY_VIOLATION)
        .bind(ReservationStatus::Expired)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn get_reservation_violations(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReservationViolation>, i64), ServiceError> {
        let violations = sqlx::query_as::<_, ReservationViolation>(
            r#"
            SELECT id, user_id, violation_type, expired_count, window_start, created_at
            FROM reservation_violations
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reservation_violations")
            .fetch_one(&self.pool)
            .await?;

        Ok((violations, total))
    }

    async fn purge_reservation_violations(&self, before: DateTime<Utc>) -> Result<u64, ServiceError> {
        let result = sqlx::query("DELETE FROM reservation_violations WHERE created_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
