// models/walletmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "wallet_transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Payment,
    Earning,
    Refund,
    Fee,
    TransferPendingToAvailable,
}

impl TransactionType {
    pub fn to_str(&self) -> &str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Payment => "payment",
            TransactionType::Earning => "earning",
            TransactionType::Refund => "refund",
            TransactionType::Fee => "fee",
            TransactionType::TransferPendingToAvailable => "transfer_pending_to_available",
        }
    }

    /// Types an admin may record by hand. Payments, earnings and releases
    /// only happen through their dedicated operations.
    pub fn is_manual_adjustment(&self) -> bool {
        matches!(
            self,
            TransactionType::Deposit
                | TransactionType::Withdrawal
                | TransactionType::Refund
                | TransactionType::Fee
        )
    }
}

/// Which balance of the wallet a transaction row touched
#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "balance_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BalanceType {
    Deposit,
    Pending,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: i64,         // minor units
    pub pending_balance: i64, // minor units
    pub total_earned: i64,
    pub total_spent: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn empty(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Wallet {
            id: Uuid::new_v4(),
            user_id,
            balance: 0,
            pending_balance: 0,
            total_earned: 0,
            total_spent: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: i64, // minor units, always positive
    pub balance_type: BalanceType,
    pub description: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// One side of a ledger mutation. Every entry becomes exactly one
/// `wallet_transactions` row and one balance change on its wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub balance_type: BalanceType,
    pub amount: i64,
    pub description: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
}

impl LedgerEntry {
    pub fn to_transaction(&self, now: DateTime<Utc>) -> WalletTransaction {
        WalletTransaction {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            transaction_type: self.transaction_type,
            amount: self.amount,
            balance_type: self.balance_type,
            description: self.description.clone(),
            reference_id: self.reference_id,
            reference_type: self.reference_type.clone(),
            status: TransactionStatus::Completed,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOrder {
    pub payer_id: Uuid,
    pub payee_id: Uuid,
    pub amount: i64,
    pub description: String,
    pub reference_id: Uuid,
    pub reference_type: String,
}
