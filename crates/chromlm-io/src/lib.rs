//! Persisted local state: named JSON records on disk, the analysis history
//! ledger built on top of them, and the user settings record.

mod ledger;
mod settings;
mod store;

pub use ledger::{DEFAULT_HISTORY_CAP, HistoryLedger};
pub use settings::SettingsStore;
pub use store::LocalStore;

pub use chromlm_error::{Error, Result};
