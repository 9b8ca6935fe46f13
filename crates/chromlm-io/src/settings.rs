use chromlm_core::{SETTINGS_KEY, Settings};
use chromlm_error::Result;

use crate::store::LocalStore;

/// The `settings` record; absent means defaults.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    store: LocalStore,
}

impl SettingsStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Settings> {
        Ok(self.store.get(SETTINGS_KEY).await?.unwrap_or_default())
    }

    pub async fn save(&self, settings: &Settings) -> Result<()> {
        self.store.set(SETTINGS_KEY, settings).await
    }
}

#[cfg(test)]
mod tests {
    use chromlm_core::{NotificationLevel, WidgetPosition};

    use super::*;

    #[tokio::test]
    async fn defaults_when_absent_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsStore::new(LocalStore::open(dir.path()).unwrap());
        assert_eq!(settings.load().await.unwrap(), Settings::default());

        let custom = Settings {
            widget_enabled: false,
            widget_position: WidgetPosition::TopLeft,
            auto_analyze: false,
            notification_level: NotificationLevel::MlmOnly,
        };
        settings.save(&custom).await.unwrap();
        assert_eq!(settings.load().await.unwrap(), custom);

        let raw = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        assert!(raw.contains("\"notificationLevel\": \"mlm-only\""));
    }
}
