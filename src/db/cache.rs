// db/cache.rs
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Cache TTL constants (in seconds)
pub const SETTINGS_CACHE_TTL: usize = 300; // 5 minutes

pub const SETTINGS_CACHE_KEY: &str = "admin_settings:platform";

pub struct CacheHelper;

impl CacheHelper {
    /// Generic get from cache
    pub async fn get<T: DeserializeOwned>(
        redis: &Arc<ConnectionManager>,
        key: &str,
    ) -> Result<Option<T>, redis::RedisError> {
        let mut conn = ConnectionManager::clone(redis);
        let cached: Option<String> = conn.get(key).await?;

        match cached {
            Some(data) => match serde_json::from_str::<T>(&data) {
                Ok(value) => {
                    tracing::debug!("Cache HIT: {}", key);
                    Ok(Some(value))
                }
                Err(_) => {
                    tracing::warn!("Cache deserialization failed for: {}", key);
                    Ok(None)
                }
            },
            None => {
                tracing::debug!("Cache MISS: {}", key);
                Ok(None)
            }
        }
    }

    /// Generic set to cache with TTL
    pub async fn set<T: Serialize>(
        redis: &Arc<ConnectionManager>,
        key: &str,
        value: &T,
        ttl_seconds: usize,
    ) -> Result<(), redis::RedisError> {
        if let Ok(json) = serde_json::to_string(value) {
            let mut conn = ConnectionManager::clone(redis);
            let _: () = conn.set_ex(key, json, ttl_seconds).await?;
            tracing::debug!("Cache SET: {} (TTL: {}s)", key, ttl_seconds);
        }
        Ok(())
    }

    /// Delete a cache key
    pub async fn delete(redis: &Arc<ConnectionManager>, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = ConnectionManager::clone(redis);
        let _: () = conn.del(key).await?;
        tracing::debug!("Cache DELETE: {}", key);
        Ok(())
    }
}
