use std::path::Path;

use chromlm_client::API_JSON_TARGET;
use chromlm_error::{Error, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{self, FilterExt, LevelFilter};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info,chromlm=debug,api_json=debug,hyper_util=error,reqwest=warn";

pub struct LoggingGuards {
    /// Guard for the main log
    pub main: WorkerGuard,
    /// Guard for the raw response log
    pub api: WorkerGuard,
}

/// Installs file logging under `log_dir`: `chromlm.log` for everything the
/// filter lets through, `api_responses.log` for raw service bodies only.
///
/// Nothing is written to the terminal, stdout belongs to command output.
pub fn init_tracing(log_dir: &Path) -> Result<LoggingGuards> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    std::fs::create_dir_all(log_dir).map_err(|e| Error::storage("create_dir", log_dir, e))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "chromlm.log");
    let (non_blocking_file, main_guard) = tracing_appender::non_blocking(file_appender);

    let main_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .with_writer(non_blocking_file)
        .with_filter(filter::filter_fn(|meta| meta.target() != API_JSON_TARGET));

    let api_appender = tracing_appender::rolling::daily(log_dir, "api_responses.log");
    let (api_non_blocking, api_guard) = tracing_appender::non_blocking(api_appender);

    // Bare formatter: the file holds response bodies and little else.
    let api_layer = fmt::layer()
        .with_writer(api_non_blocking)
        .with_ansi(false)
        .with_level(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .without_time();
    let only_api_json =
        filter::filter_fn(|meta| meta.target() == API_JSON_TARGET).and(LevelFilter::DEBUG);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(main_layer)
        .with(api_layer.with_filter(only_api_json))
        .try_init();

    Ok(LoggingGuards {
        main: main_guard,
        api: api_guard,
    })
}
