use std::time::Duration;

use chromlm_client::HttpAnalysisClient;
use chromlm_core::Settings;
use chromlm_error::Result;
use chromlm_io::{HistoryLedger, LocalStore, SettingsStore};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::user_config::UserConfig;

/// Everything a surface needs: configuration, the live settings and the
/// persisted records. Shared behind an `Arc` by every surface of a process.
#[derive(Debug)]
pub struct AppContext {
    config: UserConfig,
    settings: RwLock<Settings>,
    settings_store: SettingsStore,
    ledger: HistoryLedger,
}

impl AppContext {
    /// Opens the store, creating an empty history on first activation, and
    /// loads the persisted settings.
    #[instrument(skip(config), fields(cap = config.history_cap))]
    pub async fn open(config: UserConfig) -> Result<Self> {
        let dir = config.resolved_storage_dir()?;
        let store = LocalStore::open(&dir)?;
        let ledger = HistoryLedger::new(store.clone(), config.history_cap);
        ledger.initialize().await?;
        let settings_store = SettingsStore::new(store);
        let settings = settings_store.load().await?;
        info!(dir = %dir.display(), "storage opened");

        Ok(Self {
            config,
            settings: RwLock::new(settings),
            settings_store,
            ledger,
        })
    }

    pub fn config(&self) -> &UserConfig {
        &self.config
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn cooldown(&self) -> Duration {
        self.config.cooldown()
    }

    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Persists `settings`, then makes them current. Readers see either the
    /// old or the new settings, and never settings that failed to persist.
    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        let mut current = self.settings.write().await;
        self.settings_store.save(&settings).await?;
        debug!(?settings, "settings updated");
        *current = settings;
        Ok(())
    }

    /// Client for the configured analysis endpoint.
    pub fn http_client(&self) -> Result<HttpAnalysisClient> {
        Ok(HttpAnalysisClient::new(self.config.http_config()?))
    }
}

#[cfg(test)]
mod tests {
    use chromlm_core::NotificationLevel;

    use super::*;

    fn config_in(dir: &std::path::Path) -> UserConfig {
        UserConfig {
            storage_dir: Some(dir.to_path_buf()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_open_creates_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::open(config_in(dir.path())).await.unwrap();
        assert!(ctx.ledger().all().await.unwrap().is_empty());
        assert!(dir.path().join("history.json").is_file());
        assert_eq!(ctx.settings().await, Settings::default());
    }

    #[tokio::test]
    async fn settings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::open(config_in(dir.path())).await.unwrap();
        let mut settings = ctx.settings().await;
        settings.notification_level = NotificationLevel::HighConfidence;
        settings.auto_analyze = false;
        ctx.update_settings(settings.clone()).await.unwrap();
        assert_eq!(ctx.settings().await, settings);
        drop(ctx);

        let reopened = AppContext::open(config_in(dir.path())).await.unwrap();
        assert_eq!(reopened.settings().await, settings);
    }
}
