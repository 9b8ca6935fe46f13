//! Request/response contract between surfaces and the orchestrator.
//!
//! Messages are JSON objects discriminated by `action`; every response is
//! `{"success": true, "result": ...}` or `{"success": false, "error": "..."}`.

use chromlm_client::Analyzer;
use chromlm_core::{HistoryStats, Settings};
use chromlm_error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::orchestrator::{Orchestrator, RequestOutcome, Surface};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    AnalyzePost { url: String },
    UpdateSettings { settings: Settings },
    GetSettings,
    GetHistory,
    ClearHistory,
    GetStats,
}

impl Message {
    pub fn action(&self) -> &'static str {
        match self {
            Message::AnalyzePost { .. } => "analyzePost",
            Message::UpdateSettings { .. } => "updateSettings",
            Message::GetSettings => "getSettings",
            Message::GetHistory => "getHistory",
            Message::ClearHistory => "clearHistory",
            Message::GetStats => "getStats",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Success with nothing to return.
    pub fn done() -> Self {
        Self {
            success: true,
            result: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    fn from_result(result: Result<Value>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// Human-readable reason for an outcome that carries no result.
pub fn outcome_message(outcome: &RequestOutcome) -> &'static str {
    match outcome {
        RequestOutcome::Analyzed(_) | RequestOutcome::Cached(_) => "",
        RequestOutcome::Busy => "Analysis already in progress",
        RequestOutcome::Throttled => "Post analyzed moments ago, try again shortly",
        RequestOutcome::AwaitingUser => "Automatic analysis is off",
        RequestOutcome::Disabled => "Widget is disabled",
    }
}

/// Handles one message on behalf of `surface`. Never fails: errors are
/// reported in the response.
#[instrument(skip(orch, message), fields(action = message.action()))]
pub async fn dispatch<A: Analyzer>(
    orch: &Orchestrator<A>,
    surface: Surface,
    message: Message,
) -> MessageResponse {
    let ctx = orch.context();
    let response = match message {
        Message::AnalyzePost { url } => match orch.request(surface, &url).await {
            Ok(outcome) => match outcome.result() {
                Some(result) => MessageResponse::from_result(to_value(result)),
                None => MessageResponse::failed(outcome_message(&outcome)),
            },
            Err(e) => MessageResponse::failed(e.to_string()),
        },
        Message::UpdateSettings { settings } => match orch.update_settings(settings).await {
            Ok(()) => MessageResponse::done(),
            Err(e) => MessageResponse::failed(e.to_string()),
        },
        Message::GetSettings => MessageResponse::from_result(to_value(&ctx.settings().await)),
        Message::GetHistory => {
            MessageResponse::from_result(ctx.ledger().all().await.and_then(|h| to_value(&h)))
        }
        Message::ClearHistory => match ctx.ledger().clear().await {
            Ok(()) => MessageResponse::done(),
            Err(e) => MessageResponse::failed(e.to_string()),
        },
        Message::GetStats => MessageResponse::from_result(
            ctx.ledger()
                .all()
                .await
                .and_then(|h| to_value(&HistoryStats::from_records(&h))),
        ),
    };
    debug!(success = response.success, "message handled");
    response
}

/// Decodes `raw`, dispatches it and encodes the response.
pub async fn handle_json<A: Analyzer>(
    orch: &Orchestrator<A>,
    surface: Surface,
    raw: &str,
) -> Result<String> {
    let response = match serde_json::from_str::<Message>(raw) {
        Ok(message) => dispatch(orch, surface, message).await,
        Err(e) => MessageResponse::failed(format!("Invalid message: {e}")),
    };
    Ok(serde_json::to_string(&response)?)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_actions() {
        let msg: Message = serde_json::from_value(json!({
            "action": "analyzePost",
            "url": "https://www.instagram.com/p/XYZ/"
        }))
        .unwrap();
        assert_eq!(
            msg,
            Message::AnalyzePost {
                url: "https://www.instagram.com/p/XYZ/".into()
            }
        );

        let msg: Message = serde_json::from_value(json!({ "action": "getStats" })).unwrap();
        assert_eq!(msg.action(), "getStats");

        let msg: Message = serde_json::from_value(json!({
            "action": "updateSettings",
            "settings": { "autoAnalyze": false }
        }))
        .unwrap();
        match msg {
            Message::UpdateSettings { settings } => assert!(!settings.auto_analyze),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(serde_json::from_value::<Message>(json!({ "action": "selfDestruct" })).is_err());
    }

    #[test]
    fn response_shapes() {
        assert_eq!(
            serde_json::to_value(MessageResponse::ok(json!({ "verdict": "No" }))).unwrap(),
            json!({ "success": true, "result": { "verdict": "No" } })
        );
        assert_eq!(
            serde_json::to_value(MessageResponse::failed("API error: 500")).unwrap(),
            json!({ "success": false, "error": "API error: 500" })
        );
        assert_eq!(
            serde_json::to_value(MessageResponse::done()).unwrap(),
            json!({ "success": true })
        );
    }
}
