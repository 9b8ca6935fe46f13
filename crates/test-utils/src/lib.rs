//! Helpers shared by the test suites of every chromlm crate.
//!
//! Nothing here depends on the other workspace crates, so any of them can
//! pull this in as a dev-dependency without creating a second copy of its
//! own types.

use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Gets the absolute path to the workspace root directory
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent() // crates/
        .and_then(Path::parent) // workspace root
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")))
}

/// Gets the absolute path to the fixtures directory
pub fn fixtures_dir() -> PathBuf {
    workspace_root().join("tests/fixtures")
}

/// Back-end response bodies captured from the analysis service.
pub mod fixtures {
    /// `Yes` verdict with a string certainty and mixed reasoning values.
    pub const YES_RESULT: &str = include_str!("../../../tests/fixtures/analysis/yes.json");
    /// `No` verdict with a numeric certainty.
    pub const NO_RESULT: &str = include_str!("../../../tests/fixtures/analysis/no.json");
    /// Error sentinel: the back end declined to produce a verdict.
    pub const ERROR_RESULT: &str = include_str!("../../../tests/fixtures/analysis/error.json");
    /// An HTML error page served with a 200 status.
    pub const MALFORMED_BODY: &str = include_str!("../../../tests/fixtures/analysis/malformed.txt");

    pub fn yes_json() -> serde_json::Value {
        parse(YES_RESULT)
    }

    pub fn no_json() -> serde_json::Value {
        parse(NO_RESULT)
    }

    pub fn error_json() -> serde_json::Value {
        parse(ERROR_RESULT)
    }

    fn parse(body: &str) -> serde_json::Value {
        serde_json::from_str(body).unwrap_or_else(|e| panic!("fixture is not JSON: {e}"))
    }
}

/// `https://www.instagram.com/p/<id>/`
pub fn post_url(id: &str) -> String {
    format!("https://www.instagram.com/p/{id}/")
}

/// Installs a stderr subscriber plus an hourly file log under `test-logs/`.
/// Safe to call from every test: only the first call installs anything.
pub fn init_tracing_tests(level: Level) -> Option<WorkerGuard> {
    let env_filter = format!("{level},hyper_util=error,reqwest=warn,httpmock=warn");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&env_filter));

    let log_dir = workspace_root().join("test-logs");
    let file = std::fs::create_dir_all(&log_dir).ok().map(|_| {
        let file_appender = tracing_appender::rolling::hourly(&log_dir, "chromlm.log");
        tracing_appender::non_blocking(file_appender)
    });

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .without_time()
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_test_writer();

    match file {
        Some((writer, guard)) => {
            let file_layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .with(file_layer)
                .try_init()
                .ok()
                .map(|_| guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .try_init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_parse() {
        assert_eq!(fixtures::yes_json()["verdict"], "Yes");
        assert_eq!(fixtures::no_json()["certainty"], 92);
        assert!(fixtures::error_json()["error"].is_string());
        assert!(serde_json::from_str::<serde_json::Value>(fixtures::MALFORMED_BODY).is_err());
    }

    #[test]
    fn fixtures_dir_exists() {
        assert!(fixtures_dir().join("analysis/yes.json").is_file());
    }
}
