use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

/// Minimum certainty for a "high-confidence" notification.
pub const HIGH_CONFIDENCE_THRESHOLD: u8 = 70;

/// Corner of the page the widget is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetPosition {
    TopRight,
    TopLeft,
    #[default]
    BottomRight,
    BottomLeft,
}

/// Which verdicts are surfaced to the user without being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationLevel {
    #[default]
    All,
    MlmOnly,
    HighConfidence,
    None,
}

/// User-facing settings, persisted under the `settings` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub widget_enabled: bool,
    pub widget_position: WidgetPosition,
    pub auto_analyze: bool,
    pub notification_level: NotificationLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            widget_enabled: true,
            widget_position: WidgetPosition::default(),
            auto_analyze: true,
            notification_level: NotificationLevel::default(),
        }
    }
}

impl Settings {
    /// Whether a finished analysis should be brought to the user's attention.
    /// Errors are always shown.
    pub fn should_notify(&self, result: &AnalysisResult) -> bool {
        if result.is_error() {
            return true;
        }
        match self.notification_level {
            NotificationLevel::All => true,
            NotificationLevel::MlmOnly => result.is_mlm(),
            NotificationLevel::HighConfidence => {
                result.is_mlm() && result.certainty_percent() >= HIGH_CONFIDENCE_THRESHOLD
            }
            NotificationLevel::None => false,
        }
    }

    /// Sets one field from its JSON name and a textual value, as typed on a
    /// command line.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), String> {
        fn parse<T: serde::de::DeserializeOwned>(key: &str, value: &str) -> Result<T, String> {
            serde_json::from_value(serde_json::Value::String(value.to_string()))
                .or_else(|_| serde_json::from_str(value))
                .map_err(|e| format!("invalid value `{value}` for {key}: {e}"))
        }
        match key {
            "widgetEnabled" => self.widget_enabled = parse(key, value)?,
            "widgetPosition" => self.widget_position = parse(key, value)?,
            "autoAnalyze" => self.auto_analyze = parse(key, value)?,
            "notificationLevel" => self.notification_level = parse(key, value)?,
            other => return Err(format!("unknown setting `{other}`")),
        }
        Ok(())
    }
}
