// db/testdb.rs
//! Throwaway Postgres schemas for the storage tests. They are `#[ignore]`d;
//! run them with `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
use chrono::Utc;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use uuid::Uuid;

use super::{db::DBClient, walletdb::WalletExt};
use crate::models::{
    walletmodels::{BalanceType, LedgerEntry, TransactionType},
    workproofmodel::JobTerms,
};

const ESCROW_SCHEMA: &str = include_str!("../../migrations/20250101000000_escrow_core.sql");

/// A client on a fresh schema with the migration applied, or `None` when no
/// test database is configured.
pub async fn fresh_client() -> Option<DBClient> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL is not set; skipping Postgres test");
        return None;
    };

    let schema = format!("escrow_test_{}", Uuid::new_v4().simple());

    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::query(&format!("CREATE SCHEMA {}", schema))
        .execute(&admin)
        .await
        .expect("create test schema");
    admin.close().await;

    let options = url
        .parse::<PgConnectOptions>()
        .expect("parse TEST_DATABASE_URL")
        .options([("search_path", schema.as_str())]);
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .expect("connect to test schema");

    sqlx::raw_sql(ESCROW_SCHEMA)
        .execute(&pool)
        .await
        .expect("apply escrow schema");

    Some(DBClient::new(pool))
}

pub async fn fund(client: &DBClient, user_id: Uuid, amount: i64) {
    client
        .post_entries(
            &[LedgerEntry {
                user_id,
                transaction_type: TransactionType::Deposit,
                balance_type: BalanceType::Deposit,
                amount,
                description: Some("Test deposit".to_string()),
                reference_id: None,
                reference_type: None,
            }],
            Utc::now(),
        )
        .await
        .expect("fund wallet");
}

pub async fn add_job(client: &DBClient, terms: &JobTerms) {
    sqlx::query(
        "INSERT INTO jobs (id, employer_id, title, approval_type, manual_approval_days) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(terms.job_id)
    .bind(terms.employer_id)
    .bind(&terms.title)
    .bind(terms.approval_type)
    .bind(terms.manual_approval_days)
    .execute(&client.pool)
    .await
    .expect("insert job");
}
