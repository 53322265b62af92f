// config.rs
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub redis_url: Option<String>,
    pub cron_secret: Option<String>,
    pub allowed_origins: Vec<String>,
    pub db_max_connections: u32,
    pub settings_cache_ttl_secs: u64,
    pub reservation_sweep_interval_secs: u64,
    pub work_proof_sweep_interval_secs: u64,
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} must be a valid number", name)),
        None => Ok(default),
    }
}

impl Config {
    pub fn init() -> Result<Config> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET_KEY").context("JWT_SECRET_KEY must be set")?;

        let allowed_origins = optional_var("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:5173".to_string()]);

        Ok(Config {
            database_url,
            jwt_secret,
            port: parsed_var("PORT", 8000)?,
            redis_url: optional_var("REDIS_URL"),
            cron_secret: optional_var("CRON_SECRET"),
            allowed_origins,
            db_max_connections: parsed_var("DB_MAX_CONNECTIONS", 20)?,
            settings_cache_ttl_secs: parsed_var("SETTINGS_CACHE_TTL_SECS", 60)?,
            reservation_sweep_interval_secs: parsed_var("RESERVATION_SWEEP_INTERVAL_SECS", 300)?,
            work_proof_sweep_interval_secs: parsed_var("WORK_PROOF_SWEEP_INTERVAL_SECS", 600)?,
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Config {
        Config {
            database_url: "postgres://localhost/microjob_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            port: 8000,
            redis_url: None,
            cron_secret: Some("cron-secret".to_string()),
            allowed_origins: vec![],
            db_max_connections: 1,
            settings_cache_ttl_secs: 60,
            reservation_sweep_interval_secs: 300,
            work_proof_sweep_interval_secs: 600,
        }
    }
}
