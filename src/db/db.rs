// db/db.rs
use redis::aio::ConnectionManager;
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
    pub redis_client: Option<Arc<ConnectionManager>>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .field("redis_client", &self.redis_client.is_some())
            .finish()
    }
}

impl DBClient {
    /// PostgreSQL only, settings are read straight from the table
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient {
            pool,
            redis_client: None,
        }
    }

    /// PostgreSQL plus a Redis cache. A Redis failure degrades to no cache.
    pub async fn with_redis(pool: Pool<Postgres>, redis_url: &str) -> Self {
        let client = match redis::Client::open(redis_url) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("⚠️ Failed to create Redis client: {}. Continuing without cache.", e);
                return DBClient::new(pool);
            }
        };

        match ConnectionManager::new(client).await {
            Ok(conn) => {
                tracing::info!("✅ Redis connection established successfully");
                DBClient {
                    pool,
                    redis_client: Some(Arc::new(conn)),
                }
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to connect to Redis: {}. Continuing without cache.", e);
                DBClient::new(pool)
            }
        }
    }

    pub fn cache_status(&self) -> &str {
        if self.redis_client.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    }
}
