//! Plain-text views of results, failures, the history and statistics.

use std::fmt::Write as _;

use chromlm_core::{AnalysisRecord, AnalysisResult, HistoryStats, Settings};
use chromlm_error::Error;

use crate::messaging::outcome_message;
use crate::orchestrator::RequestOutcome;

const BAR_WIDTH: usize = 20;

/// `[#######-------------]` for a 0-100 value.
pub fn certainty_bar(percent: u8) -> String {
    let filled = (usize::from(percent.min(100)) * BAR_WIDTH).div_ceil(100);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn verdict_label(result: &AnalysisResult) -> &str {
    result
        .verdict
        .as_ref()
        .map(|v| v.as_str())
        .unwrap_or("Unknown")
}

pub fn render_result(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let certainty = result.certainty_percent();
    let _ = writeln!(out, "MLM Detected: {}", verdict_label(result));
    let _ = writeln!(out, "Certainty:    {certainty}% {}", certainty_bar(certainty));

    let factors = result.factors();
    if !factors.is_empty() {
        let _ = writeln!(out, "Factors:");
        for factor in factors {
            match factor.positive {
                Some(true) => {
                    let _ = writeln!(out, "  [x] {}", factor.name);
                }
                Some(false) => {
                    let _ = writeln!(out, "  [ ] {}", factor.name);
                }
                None => {
                    let _ = writeln!(out, "      {}: {}", factor.name, factor.value);
                }
            }
        }
    }
    out
}

pub fn render_outcome(outcome: &RequestOutcome) -> String {
    match outcome {
        RequestOutcome::Analyzed(result) => render_result(result),
        RequestOutcome::Cached(result) => {
            format!("{}(from history)\n", render_result(result))
        }
        other => format!("{}\n", outcome_message(other)),
    }
}

/// Failure text. Kept visibly apart from a "No" verdict.
pub fn render_error(err: &Error) -> String {
    let mut out = format!("Analysis failed: {err}\n");
    if err.is_retryable() {
        out.push_str("Nothing was saved. Run the same command again to retry.\n");
    }
    out
}

pub fn render_history(records: &[AnalysisRecord]) -> String {
    if records.is_empty() {
        return "No analysis history yet.\n".to_string();
    }
    let mut out = String::new();
    for record in records {
        let _ = writeln!(
            out,
            "{:<16} {:<8} {:>4}%  {}  {}",
            record.post_id,
            verdict_label(&record.result),
            record.result.certainty_percent(),
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.url,
        );
    }
    out
}

pub fn render_stats(stats: &HistoryStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Posts analyzed: {}", stats.total_analyzed);
    let _ = writeln!(out, "MLM detected:   {}", stats.mlm_detected);
    let _ = writeln!(out, "MLM share:      {}%", stats.mlm_percentage);
    if !stats.has_certainty_data() {
        let _ = writeln!(out, "No certainty data yet.");
        return out;
    }
    let _ = writeln!(out, "Certainty distribution:");
    let peak = stats
        .certainty_buckets
        .iter()
        .map(|b| b.count)
        .max()
        .unwrap_or(0)
        .max(1);
    for bucket in &stats.certainty_buckets {
        let filled = bucket.count * BAR_WIDTH / peak;
        let _ = writeln!(
            out,
            "  {:>8} {:<width$} {}",
            bucket.label(),
            "#".repeat(filled),
            bucket.count,
            width = BAR_WIDTH
        );
    }
    out
}

pub fn render_settings(settings: &Settings) -> String {
    match serde_json::to_value(settings) {
        Ok(serde_json::Value::Object(fields)) => fields
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => format!("{key} = {s}\n"),
                other => format!("{key} = {other}\n"),
            })
            .collect(),
        _ => format!("{settings:?}\n"),
    }
}
