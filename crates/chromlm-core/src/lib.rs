//! Data model shared by every chromlm crate: post addresses, analysis
//! results as the back end reports them, the records kept in the history
//! ledger, user settings and the statistics derived from the history.

pub mod analysis;
pub mod post_url;
pub mod settings;
pub mod stats;

pub use analysis::{AnalysisRecord, AnalysisResult, Certainty, Factor, ReasoningValue, Verdict};
pub use post_url::{PostUrl, extract_post_id, is_instagram_post};
pub use settings::{NotificationLevel, Settings, WidgetPosition};
pub use stats::{CertaintyBucket, HistoryStats};

/// Named record holding the analysis history.
pub const HISTORY_KEY: &str = "history";
/// Named record holding the user settings.
pub const SETTINGS_KEY: &str = "settings";
