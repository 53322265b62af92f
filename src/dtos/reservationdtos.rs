// dtos/reservationdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::reservationmodel::{JobReservation, ReservationStatus, ReservationWithJob},
    utils::currency::from_minor_units,
};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateReservationDto {
    pub job_id: Uuid,
    /// Omitted, zero or negative uses the platform default
    #[validate(range(max = 10080, message = "Duration cannot exceed 10080 minutes"))]
    #[serde(default)]
    pub duration_minutes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReservationResponseDto {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub status: ReservationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_budget: Option<f64>,
}

impl From<JobReservation> for ReservationResponseDto {
    fn from(r: JobReservation) -> Self {
        Self {
            id: r.id,
            job_id: r.job_id,
            user_id: r.user_id,
            status: r.status,
            expires_at: r.expires_at,
            created_at: r.created_at,
            job_title: None,
            job_budget: None,
        }
    }
}

impl From<ReservationWithJob> for ReservationResponseDto {
    fn from(r: ReservationWithJob) -> Self {
        Self {
            job_title: r.job_title,
            job_budget: r.job_budget.map(from_minor_units),
            ..r.reservation.into()
        }
    }
}
