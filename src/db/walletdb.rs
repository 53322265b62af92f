// db/walletdb.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::{db::DBClient, posting};
use crate::{
    models::walletmodels::{LedgerEntry, Wallet, WalletTransaction},
    service::error::ServiceError,
};

#[async_trait]
pub trait WalletExt: Send + Sync {
    async fn get_wallet(&self, user_id: Uuid) -> Result<Option<Wallet>, ServiceError>;

    async fn get_or_create_wallet(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Wallet, ServiceError>;

    /// Apply all entries in one storage transaction, returning the rows
    /// written in entry order.
    async fn post_entries(
        &self,
        entries: &[LedgerEntry],
        now: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>, ServiceError>;

    async fn get_wallet_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, ServiceError>;
}

const WALLET_COLUMNS: &str =
    "id, user_id, balance, pending_balance, total_earned, total_spent, created_at, updated_at";

async fn ensure_wallet(
    conn: &mut PgConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    sqlx::query(
        r#"
        INSERT INTO wallets (id, user_id, balance, pending_balance, total_earned, total_spent, created_at, updated_at)
        VALUES ($1, $2, 0, 0, 0, 0, $3, $3)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Post ledger entries on an open transaction. Wallet rows are locked in
/// user id order so two postings touching the same pair of users cannot
/// deadlock.
pub(crate) async fn post_entries_on(
    conn: &mut PgConnection,
    entries: &[LedgerEntry],
    now: DateTime<Utc>,
) -> Result<Vec<WalletTransaction>, ServiceError> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let mut user_ids: Vec<Uuid> = entries.iter().map(|e| e.user_id).collect();
    user_ids.sort();
    user_ids.dedup();

    let mut wallets: HashMap<Uuid, Wallet> = HashMap::with_capacity(user_ids.len());
    for user_id in user_ids {
        ensure_wallet(&mut *conn, user_id, now).await?;

        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {} FROM wallets WHERE user_id = $1 FOR UPDATE",
            WALLET_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        wallets.insert(user_id, wallet);
    }

    posting::apply_entries(&mut wallets, entries, now)?;

    for wallet in wallets.values() {
        sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $2,
                pending_balance = $3,
                total_earned = $4,
                total_spent = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(wallet.id)
        .bind(wallet.balance)
        .bind(wallet.pending_balance)
        .bind(wallet.total_earned)
        .bind(wallet.total_spent)
        .bind(wallet.updated_at)
        .execute(&mut *conn)
        .await?;
    }

    let mut transactions = Vec::with_capacity(entries.len());
    for entry in entries {
        let row = entry.to_transaction(now);
        let inserted = sqlx::query_as::<_, WalletTransaction>(
            r#"
            INSERT INTO wallet_transactions
                (id, user_id, transaction_type, amount, balance_type, description,
                 reference_id, reference_type, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, transaction_type, amount, balance_type, description,
                      reference_id, reference_type, status, created_at
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.transaction_type)
        .bind(row.amount)
        .bind(row.balance_type)
        .bind(&row.description)
        .bind(row.reference_id)
        .bind(&row.reference_type)
        .bind(row.status)
        .bind(row.created_at)
        .fetch_one(&mut *conn)
        .await?;

        transactions.push(inserted);
    }

    Ok(transactions)
}

#[async_trait]
impl WalletExt for DBClient {
    async fn get_wallet(&self, user_id: Uuid) -> Result<Option<Wallet>, ServiceError> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {} FROM wallets WHERE user_id = $1",
            WALLET_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    async fn get_or_create_wallet(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Wallet, ServiceError> {
        if let Some(wallet) = self.get_wallet(user_id).await? {
            return Ok(wallet);
        }

        let mut conn = self.pool.acquire().await?;
        ensure_wallet(&mut *conn, user_id, now).await?;

        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {} FROM wallets WHERE user_id = $1",
            WALLET_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(wallet)
    }

    async fn post_entries(
        &self,
        entries: &[LedgerEntry],
        now: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let transactions = post_entries_on(&mut *tx, entries, now).await?;
        tx.commit().await?;

        Ok(transactions)
    }

    async fn get_wallet_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, ServiceError> {
        let transactions = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, user_id, transaction_type, amount, balance_type, description,
                   reference_id, reference_type, status, created_at
            FROM wallet_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}
