// service/settings_service.rs
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;
use validator::Validate;

use crate::{
    db::{settingsdb::SettingsExt, LedgerStore},
    models::settingsmodel::PlatformSettings,
    service::error::ServiceError,
    utils::clock::Clock,
};

#[derive(Debug)]
struct CachedSettings {
    loaded_at: Instant,
    settings: Arc<PlatformSettings>,
}

/// Read-through snapshot of the admin settings. Reloaded once the TTL has
/// passed or after `invalidate`.
#[derive(Debug)]
pub struct SettingsService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    cached: RwLock<Option<CachedSettings>>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            cached: RwLock::new(None),
        }
    }

    pub async fn snapshot(&self) -> Result<Arc<PlatformSettings>, ServiceError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(cached.settings.clone());
            }
        }

        let settings = Arc::new(self.store.load_settings().await?);
        *self.cached.write().await = Some(CachedSettings {
            loaded_at: Instant::now(),
            settings: settings.clone(),
        });

        Ok(settings)
    }

    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    pub async fn update(&self, settings: PlatformSettings) -> Result<Arc<PlatformSettings>, ServiceError> {
        settings
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        self.store.save_settings(&settings, self.clock.now()).await?;
        self.invalidate().await;

        tracing::info!("Platform settings updated");

        self.snapshot().await
    }
}
