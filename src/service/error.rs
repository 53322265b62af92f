use thiserror::Error;
use uuid::Uuid;

use crate::{error::HttpError, utils::currency::format_amount};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("You already hold an active reservation for job {job_id}")]
    DuplicateReservation { job_id: Uuid },

    #[error("You can hold at most {limit} active reservations")]
    ReservationLimitExceeded { limit: i64 },

    #[error(
        "Insufficient balance: required {}, available {}",
        format_amount(.required),
        format_amount(.available)
    )]
    InsufficientBalance { required: i64, available: i64 },

    #[error(
        "Insufficient pending balance: required {}, available {}",
        format_amount(.required),
        format_amount(.available)
    )]
    InsufficientPendingBalance { required: i64, available: i64 },

    #[error("Work proof {0} has already been settled")]
    AlreadySettled(Uuid),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }

    /// Outcomes that only mean another caller got there first
    pub fn is_lost_race(&self) -> bool {
        matches!(self, ServiceError::AlreadySettled(_) | ServiceError::InvalidState(_))
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Storage failure: {}", err);
        ServiceError::StorageFailure(err.to_string())
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::NotFound(_) => HttpError::not_found(error.to_string()),

            ServiceError::DuplicateReservation { .. }
            | ServiceError::ReservationLimitExceeded { .. }
            | ServiceError::AlreadySettled(_)
            | ServiceError::InvalidState(_) => HttpError::conflict(error.to_string()),

            ServiceError::InsufficientBalance { .. }
            | ServiceError::InsufficientPendingBalance { .. } => {
                HttpError::payment_required(error.to_string())
            }

            ServiceError::Validation(_) => HttpError::bad_request(error.to_string()),

            ServiceError::StorageFailure(_) => {
                HttpError::server_error("Something went wrong. Please try again later")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn kinds_map_to_status_codes() {
        let cases = vec![
            (ServiceError::not_found("Work proof"), StatusCode::NOT_FOUND),
            (
                ServiceError::DuplicateReservation { job_id: Uuid::new_v4() },
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::ReservationLimitExceeded { limit: 2 },
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::InsufficientBalance { required: 15_000, available: 10_000 },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                ServiceError::InsufficientPendingBalance { required: 1, available: 0 },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (ServiceError::AlreadySettled(Uuid::new_v4()), StatusCode::CONFLICT),
            (ServiceError::InvalidState("rejected".into()), StatusCode::CONFLICT),
            (ServiceError::Validation("amount".into()), StatusCode::BAD_REQUEST),
        ];

        for (error, status) in cases {
            assert_eq!(HttpError::from(error).status, status);
        }
    }

    #[test]
    fn storage_detail_is_not_exposed() {
        let error = HttpError::from(ServiceError::StorageFailure(
            "relation \"wallets\" does not exist".into(),
        ));
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!error.message.contains("wallets"));
    }

    #[test]
    fn insufficient_balance_message_uses_decimal_amounts() {
        let error = ServiceError::InsufficientBalance { required: 15_000, available: 10_000 };
        assert_eq!(
            error.to_string(),
            "Insufficient balance: required 150.00, available 100.00"
        );
    }
}
