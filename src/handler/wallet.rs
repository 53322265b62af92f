// handler/wallet.rs
use std::sync::Arc;

use axum::{
    extract::Query,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{
        walletdtos::{
            TransactionHistoryQuery, TransactionResponseDto, WalletResponseDto, WithdrawDto,
            WithdrawalResponseDto,
        },
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    utils::currency::to_minor_units,
    AppState,
};

pub fn wallet_handler() -> Router {
    Router::new()
        .route("/", get(get_wallet))
        .route("/transactions", get(get_transaction_history))
        .route("/withdraw", post(withdraw))
}

pub async fn get_wallet(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let wallet = app_state
        .wallet_service
        .get_or_create_wallet(auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Wallet retrieved successfully",
        WalletResponseDto::from(wallet),
    )))
}

pub async fn get_transaction_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<TransactionHistoryQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let transactions = app_state
        .wallet_service
        .get_transactions(auth.user_id, params.limit(), params.offset())
        .await?;

    let transactions: Vec<TransactionResponseDto> =
        transactions.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::success(
        "Transactions retrieved successfully",
        transactions,
    )))
}

pub async fn withdraw(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<WithdrawDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let amount = to_minor_units(body.amount).map_err(HttpError::bad_request)?;
    let settings = app_state.settings_service.snapshot().await?;

    let receipt = app_state
        .wallet_service
        .withdraw(auth.user_id, amount, &settings.fee)
        .await?;

    Ok(Json(ApiResponse::success(
        "Withdrawal recorded successfully",
        WithdrawalResponseDto::from(receipt),
    )))
}
