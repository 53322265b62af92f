use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{
    error::{ErrorMessage, HttpError},
    models::usermodel::UserRole,
    utils::token,
    AppState,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JWTAuthMiddeware {
    pub user_id: Uuid,
    pub role: UserRole,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
}

pub async fn auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = cookie_jar
        .get("token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| bearer_token(req.headers()))
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let claims = token::decode_token(token, app_state.env.jwt_secret.as_bytes())?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    req.extensions_mut().insert(JWTAuthMiddeware {
        user_id,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

pub async fn role_check(
    Extension(_app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let user = req
        .extensions()
        .get::<JWTAuthMiddeware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles.contains(&user.role) {
        tracing::warn!(
            "User {} with role {} denied access to {}",
            user.user_id,
            user.role.to_str(),
            req.uri().path()
        );
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }

    Ok(next.run(req).await)
}

/// Scheduler endpoints authenticate with `Authorization: Bearer <CRON_SECRET>`
pub async fn cron_auth(
    Extension(app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let expected = app_state.env.cron_secret.as_deref().ok_or_else(|| {
        tracing::error!("CRON_SECRET is not configured; rejecting cron request");
        HttpError::server_error(ErrorMessage::CronNotConfigured.to_string())
    })?;

    let provided = bearer_token(req.headers())
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let matches: bool = provided.as_bytes().ct_eq(expected.as_bytes()).into();
    if !matches {
        tracing::warn!("Rejected cron request with an invalid secret");
        return Err(HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()));
    }

    Ok(next.run(req).await)
}
