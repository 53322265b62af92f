// dtos/walletdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::walletmodels::{BalanceType, TransactionStatus, TransactionType, Wallet, WalletTransaction},
    service::wallet_service::WithdrawalReceipt,
    utils::currency::from_minor_units,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponseDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: f64,
    pub pending_balance: f64,
    pub total_earned: f64,
    pub total_spent: f64,
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponseDto {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            user_id: wallet.user_id,
            balance: from_minor_units(wallet.balance),
            pending_balance: from_minor_units(wallet.pending_balance),
            total_earned: from_minor_units(wallet.total_earned),
            total_spent: from_minor_units(wallet.total_spent),
            updated_at: wallet.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponseDto {
    pub id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub balance_type: BalanceType,
    pub description: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<WalletTransaction> for TransactionResponseDto {
    fn from(tx: WalletTransaction) -> Self {
        Self {
            id: tx.id,
            transaction_type: tx.transaction_type,
            amount: from_minor_units(tx.amount),
            balance_type: tx.balance_type,
            description: tx.description,
            reference_id: tx.reference_id,
            reference_type: tx.reference_type,
            status: tx.status,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionHistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TransactionHistoryQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct WithdrawDto {
    #[validate(range(min = 0.01, message = "Amount must be at least 0.01"))]
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawalResponseDto {
    pub withdrawal: TransactionResponseDto,
    pub fee: Option<TransactionResponseDto>,
}

impl From<WithdrawalReceipt> for WithdrawalResponseDto {
    fn from(receipt: WithdrawalReceipt) -> Self {
        Self {
            withdrawal: receipt.withdrawal.into(),
            fee: receipt.fee.map(Into::into),
        }
    }
}
