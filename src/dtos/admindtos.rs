// dtos/admindtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::walletdtos::TransactionResponseDto,
    models::{
        reservationmodel::ReservationViolation,
        walletmodels::{BalanceType, TransactionType},
    },
    service::wallet_service::PaymentReceipt,
};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AdjustmentDto {
    pub transaction_type: TransactionType,

    #[validate(range(min = 0.01, message = "Amount must be at least 0.01"))]
    pub amount: f64,

    #[serde(default = "default_balance_type")]
    pub balance_type: BalanceType,

    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
}

fn default_balance_type() -> BalanceType {
    BalanceType::Deposit
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AdminPaymentDto {
    pub payer_id: Uuid,
    pub payee_id: Uuid,

    #[validate(range(min = 0.01, message = "Amount must be at least 0.01"))]
    pub amount: f64,

    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,

    pub reference_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponseDto {
    pub payer_transaction: TransactionResponseDto,
    pub payee_transaction: TransactionResponseDto,
}

impl From<PaymentReceipt> for PaymentResponseDto {
    fn from(receipt: PaymentReceipt) -> Self {
        Self {
            payer_transaction: receipt.payer_transaction.into(),
            payee_transaction: receipt.payee_transaction.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ReleasePendingDto {
    #[validate(range(min = 0.01, message = "Amount must be at least 0.01"))]
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViolationResponseDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub violation_type: String,
    pub expired_count: i64,
    pub window_start: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<ReservationViolation> for ViolationResponseDto {
    fn from(v: ReservationViolation) -> Self {
        Self {
            id: v.id,
            user_id: v.user_id,
            violation_type: v.violation_type,
            expired_count: v.expired_count,
            window_start: v.window_start,
            created_at: v.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronTriggerDto {
    pub job_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjustment_defaults_to_deposit_balance() {
        let dto: AdjustmentDto =
            serde_json::from_str(r#"{"transaction_type":"deposit","amount":25.5}"#).unwrap();
        assert_eq!(dto.balance_type, BalanceType::Deposit);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn cron_trigger_reads_camel_case() {
        let dto: CronTriggerDto =
            serde_json::from_str(r#"{"jobType":"expire-reservations"}"#).unwrap();
        assert_eq!(dto.job_type, "expire-reservations");
    }
}
