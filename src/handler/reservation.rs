// handler/reservation.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        reservationdtos::{CreateReservationDto, ReservationResponseDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn reservation_handler() -> Router {
    Router::new()
        .route("/", get(get_active_reservations).post(create_reservation))
        .route("/:reservation_id", delete(cancel_reservation))
}

pub async fn create_reservation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateReservationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let reservation = app_state
        .reservation_service
        .create_reservation(body.job_id, auth.user_id, body.duration_minutes)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Job reserved successfully",
            ReservationResponseDto::from(reservation),
        )),
    ))
}

pub async fn get_active_reservations(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let reservations = app_state
        .reservation_service
        .list_active_reservations(auth.user_id)
        .await?;

    let reservations: Vec<ReservationResponseDto> =
        reservations.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::success(
        "Active reservations retrieved successfully",
        reservations,
    )))
}

pub async fn cancel_reservation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(reservation_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let reservation = app_state
        .reservation_service
        .cancel_reservation(reservation_id, auth.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Reservation cancelled successfully",
        ReservationResponseDto::from(reservation),
    )))
}
