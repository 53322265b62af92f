mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::{sync::Arc, time::Duration};

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use db::{db::DBClient, LedgerStore};
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use service::{
    reservation_service::ReservationService, settings_service::SettingsService,
    sweeper::ExpirySweeper, wallet_service::WalletService, workproof_service::WorkProofService,
};
use utils::clock::{Clock, SystemClock};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub wallet_service: Arc<WalletService>,
    pub reservation_service: Arc<ReservationService>,
    pub work_proof_service: Arc<WorkProofService>,
    pub settings_service: Arc<SettingsService>,
    pub sweeper: Arc<ExpirySweeper>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, config: Config) -> Self {
        let settings_service = Arc::new(SettingsService::new(
            store.clone(),
            clock.clone(),
            Duration::from_secs(config.settings_cache_ttl_secs),
        ));

        let wallet_service = Arc::new(WalletService::new(store.clone(), clock.clone()));

        let reservation_service = Arc::new(ReservationService::new(
            store.clone(),
            settings_service.clone(),
            clock.clone(),
        ));

        let work_proof_service = Arc::new(WorkProofService::new(
            store,
            settings_service.clone(),
            clock.clone(),
        ));

        let sweeper = Arc::new(ExpirySweeper::new(
            reservation_service.clone(),
            work_proof_service.clone(),
            clock,
        ));

        Self {
            env: config,
            wallet_service,
            reservation_service,
            work_proof_service,
            settings_service,
            sweeper,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::DEBUG);

    tracing_subscriber::fmt().with_max_level(log_level).init();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            println!("🔥 Invalid configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_max_connections.min(5))
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            println!("✅ Connection to the database is successful!");
            println!("📊 Max connections: {}", config.db_max_connections);
            pool
        }
        Err(err) => {
            println!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = match config.redis_url {
        Some(ref redis_url) => DBClient::with_redis(pool, redis_url).await,
        None => {
            println!("ℹ️  Redis not configured - settings are read from the database (set REDIS_URL to enable)");
            DBClient::new(pool)
        }
    };
    println!("📊 Cache status: {}", db_client.cache_status());

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let store: Arc<dyn LedgerStore> = Arc::new(db_client);
    let app_state = Arc::new(AppState::new(store, Arc::new(SystemClock), config.clone()));

    let app = create_router(app_state.clone()).layer(cors);

    tokio::spawn(service::background_jobs::start_reservation_expiry_job(app_state.clone()));
    tokio::spawn(service::background_jobs::start_work_proof_timeout_job(app_state.clone()));
    tokio::spawn(service::background_jobs::start_violation_cleanup_job(app_state.clone()));

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            println!("🔥 Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    println!("🚀 Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
    }
}
