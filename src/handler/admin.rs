// handler/admin.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        admindtos::{
            AdjustmentDto, AdminPaymentDto, PaymentResponseDto, ReleasePendingDto,
            ViolationResponseDto,
        },
        walletdtos::TransactionResponseDto,
        ApiResponse, PageQuery, PaginatedResponse,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::{
        settingsmodel::PlatformSettings, usermodel::UserRole, walletmodels::PaymentOrder,
    },
    service::wallet_service::Adjustment,
    utils::currency::to_minor_units,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/settings", get(get_settings).put(update_settings))
        .route("/wallets/:user_id/adjustments", post(record_adjustment))
        .route("/wallets/:user_id/release", post(release_pending))
        .route("/payments", post(process_payment))
        .route("/reservation-violations", get(get_reservation_violations))
        .route("/sweep", post(run_sweep))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Admin, UserRole::SuperAdmin])
        }))
}

pub async fn get_settings(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let settings = app_state.settings_service.snapshot().await?;

    Ok(Json(ApiResponse::success(
        "Settings retrieved successfully",
        settings.as_ref().clone(),
    )))
}

pub async fn update_settings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<PlatformSettings>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let settings = app_state.settings_service.update(body).await?;

    tracing::info!("Platform settings changed by admin {}", auth.user_id);

    Ok(Json(ApiResponse::success(
        "Settings updated successfully",
        settings.as_ref().clone(),
    )))
}

pub async fn record_adjustment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<AdjustmentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let amount = to_minor_units(body.amount).map_err(HttpError::bad_request)?;

    let transaction = app_state
        .wallet_service
        .record_adjustment(Adjustment {
            user_id,
            transaction_type: body.transaction_type,
            amount,
            balance_type: body.balance_type,
            description: body.description,
        })
        .await?;

    tracing::info!(
        "Admin {} recorded {} adjustment for user {}",
        auth.user_id,
        transaction.transaction_type.to_str(),
        user_id
    );

    Ok(Json(ApiResponse::success(
        "Adjustment recorded successfully",
        TransactionResponseDto::from(transaction),
    )))
}

pub const ADMIN_PAYMENT_REFERENCE: &str = "admin_payment";

/// Operator-initiated transfer from one user's balance to another's pending
/// balance, with the same all-or-nothing posting as a work proof payment.
pub async fn process_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<AdminPaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let amount = to_minor_units(body.amount).map_err(HttpError::bad_request)?;

    let receipt = app_state
        .wallet_service
        .process_payment(PaymentOrder {
            payer_id: body.payer_id,
            payee_id: body.payee_id,
            amount,
            description: body.description,
            reference_id: body.reference_id.unwrap_or_else(Uuid::new_v4),
            reference_type: ADMIN_PAYMENT_REFERENCE.to_string(),
        })
        .await?;

    tracing::info!(
        "Admin {} moved {} from {} to {}",
        auth.user_id,
        amount,
        body.payer_id,
        body.payee_id
    );

    Ok(Json(ApiResponse::success(
        "Payment processed successfully",
        PaymentResponseDto::from(receipt),
    )))
}

pub async fn release_pending(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<ReleasePendingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let amount = to_minor_units(body.amount).map_err(HttpError::bad_request)?;

    let transaction = app_state
        .wallet_service
        .release_pending(user_id, amount)
        .await?;

    Ok(Json(ApiResponse::success(
        "Pending balance released successfully",
        TransactionResponseDto::from(transaction),
    )))
}

pub async fn get_reservation_violations(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let (violations, total) = app_state
        .reservation_service
        .list_violations(params.limit() as i64, params.offset())
        .await?;

    let violations: Vec<ViolationResponseDto> = violations.into_iter().map(Into::into).collect();

    Ok(Json(PaginatedResponse::new(
        violations,
        total,
        params.page(),
        params.limit(),
    )))
}

pub async fn run_sweep(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    tracing::info!("Manual sweep triggered by admin {}", auth.user_id);

    let report = app_state.sweeper.run_once().await;

    Ok(Json(ApiResponse::success("Sweep completed", report)))
}
