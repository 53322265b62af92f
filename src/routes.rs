use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler, cron::cron_handler, reservation::reservation_handler,
        wallet::wallet_handler, workproof::work_proof_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/wallet", wallet_handler().layer(middleware::from_fn(auth)))
        .nest(
            "/reservations",
            reservation_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/work-proofs",
            work_proof_handler().layer(middleware::from_fn(auth)),
        )
        .nest("/admin", admin_handler().layer(middleware::from_fn(auth)))
        .nest("/cron", cron_handler())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
