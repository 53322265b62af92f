use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "reservation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Active,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct JobReservation {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub status: ReservationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobReservation {
    /// A hold counts only while it is active and its deadline is still ahead.
    /// The sweeper uses the exact complement (`expires_at <= now`).
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Active && self.expires_at > now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReservationWithJob {
    #[sqlx(flatten)]
    pub reservation: JobReservation,
    pub job_title: Option<String>,
    pub job_budget: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct ReservationViolation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub violation_type: String,
    pub expired_count: i64,
    pub window_start: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

pub const REPEATED_EXPIRY_VIOLATION: &str = "repeated_expiry";
/// Expired holds inside the window that make a user a violator
pub const VIOLATION_EXPIRY_THRESHOLD: i64 = 2;
pub const VIOLATION_WINDOW_HOURS: i64 = 24;
pub const VIOLATION_RETENTION_DAYS: i64 = 180;
