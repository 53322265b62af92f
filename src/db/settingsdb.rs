// db/settingsdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    cache::{CacheHelper, SETTINGS_CACHE_KEY, SETTINGS_CACHE_TTL},
    db::DBClient,
};
use crate::{
    models::settingsmodel::{PlatformSettings, SETTING_KEYS},
    service::error::ServiceError,
};

#[async_trait]
pub trait SettingsExt: Send + Sync {
    async fn load_settings(&self) -> Result<PlatformSettings, ServiceError>;

    async fn save_settings(
        &self,
        settings: &PlatformSettings,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError>;
}

#[async_trait]
impl SettingsExt for DBClient {
    async fn load_settings(&self) -> Result<PlatformSettings, ServiceError> {
        if let Some(redis) = &self.redis_client {
            match CacheHelper::get::<PlatformSettings>(redis, SETTINGS_CACHE_KEY).await {
                Ok(Some(settings)) => return Ok(settings),
                Ok(None) => {}
                Err(e) => tracing::warn!("Settings cache read failed: {}", e),
            }
        }

        let keys: Vec<String> = SETTING_KEYS.iter().map(|k| k.to_string()).collect();
        let documents = sqlx::query_as::<_, (String, serde_json::Value)>(
            "SELECT setting_key, setting_value FROM admin_settings WHERE setting_key = ANY($1)",
        )
        .bind(&keys)
        .fetch_all(&self.pool)
        .await?;

        let settings = PlatformSettings::from_documents(documents);

        if let Some(redis) = &self.redis_client {
            if let Err(e) = CacheHelper::set(redis, SETTINGS_CACHE_KEY, &settings, SETTINGS_CACHE_TTL).await {
                tracing::warn!("Settings cache write failed: {}", e);
            }
        }

        Ok(settings)
    }

    async fn save_settings(
        &self,
        settings: &PlatformSettings,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let documents = settings
            .to_documents()
            .map_err(|e| ServiceError::Validation(format!("Invalid settings: {}", e)))?;

        let mut tx = self.pool.begin().await?;

        for (key, value) in documents {
            sqlx::query(
                r#"
                INSERT INTO admin_settings (setting_key, setting_value, updated_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (setting_key)
                DO UPDATE SET setting_value = EXCLUDED.setting_value, updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        if let Some(redis) = &self.redis_client {
            if let Err(e) = CacheHelper::delete(redis, SETTINGS_CACHE_KEY).await {
                tracing::warn!("Settings cache invalidation failed: {}", e);
            }
        }

        Ok(())
    }
}
