use std::path::Path;
use std::sync::Arc;

use chromlm::cli::{Command, SettingsCommand, execute};
use chromlm::{AppContext, Orchestrator, Surface, UserConfig};
use chromlm_core::NotificationLevel;
use chromlm_test_utils::{fixtures, post_url};
use httpmock::prelude::*;

async fn orchestrator(server: &MockServer, dir: &Path) -> Orchestrator {
    let config = UserConfig {
        endpoint: server.url("/analyze/"),
        storage_dir: Some(dir.to_path_buf()),
        ..Default::default()
    };
    Orchestrator::with_http(Arc::new(AppContext::open(config).await.unwrap())).unwrap()
}

async fn run(orch: &Orchestrator, command: Command) -> String {
    let mut out = Vec::new();
    execute(orch, command, &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn analyze_then_inspect_history() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/analyze/");
            then.status(200).body(fixtures::YES_RESULT);
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(&server, dir.path()).await;

    let text = run(
        &orch,
        Command::Analyze {
            url: post_url("XYZ"),
            surface: Surface::Popup,
        },
    )
    .await;
    assert!(text.starts_with("MLM Detected: Yes"), "{text}");
    assert!(text.contains("[x] Urgency Language"));

    let again = run(
        &orch,
        Command::Analyze {
            url: post_url("XYZ"),
            surface: Surface::Popup,
        },
    )
    .await;
    assert!(again.ends_with("(from history)\n"));

    let history = run(&orch, Command::History { json: true }).await;
    let records: serde_json::Value = serde_json::from_str(&history).unwrap();
    assert_eq!(records[0]["postId"], "XYZ");
    assert_eq!(records[0]["result"]["verdict"], "Yes");

    let stats = run(&orch, Command::Stats { json: true }).await;
    let stats: serde_json::Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(stats["totalAnalyzed"], 1);
    assert_eq!(stats["mlmPercentage"], 100);
}

#[tokio::test]
async fn clear_needs_confirmation() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/analyze/");
            then.status(200).body(fixtures::NO_RESULT);
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(&server, dir.path()).await;
    orch.request(Surface::Popup, &post_url("XYZ")).await.unwrap();

    let refused = run(&orch, Command::Clear { yes: false }).await;
    assert!(refused.is_empty());
    assert_eq!(orch.context().ledger().all().await.unwrap().len(), 1);

    let cleared = run(&orch, Command::Clear { yes: true }).await;
    assert_eq!(cleared, "History cleared.\n");
    assert!(orch.context().ledger().all().await.unwrap().is_empty());
    assert_eq!(
        run(&orch, Command::History { json: false }).await,
        "No analysis history yet.\n"
    );
}

#[tokio::test]
async fn settings_set_persists() {
    let server = MockServer::start_async().await;
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(&server, dir.path()).await;

    let text = run(
        &orch,
        Command::Settings(SettingsCommand::Set {
            key: "notificationLevel".into(),
            value: "high-confidence".into(),
        }),
    )
    .await;
    assert!(text.contains("notificationLevel = high-confidence"));

    let reopened = orchestrator(&server, dir.path()).await;
    assert_eq!(
        reopened.context().settings().await.notification_level,
        NotificationLevel::HighConfidence
    );

    let mut out = Vec::new();
    let bad = execute(
        &reopened,
        Command::Settings(SettingsCommand::Set {
            key: "theme".into(),
            value: "dark".into(),
        }),
        &mut out,
    )
    .await;
    assert!(bad.is_err());
}

#[tokio::test]
async fn quiet_visit_below_notification_level() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/analyze/");
            then.status(200).body(fixtures::NO_RESULT);
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(&server, dir.path()).await;

    let mut settings = orch.context().settings().await;
    settings.notification_level = NotificationLevel::MlmOnly;
    orch.update_settings(settings).await.unwrap();

    let text = run(
        &orch,
        Command::Visit {
            url: post_url("XYZ"),
            surface: Surface::Widget,
        },
    )
    .await;
    assert_eq!(text, "Analysis saved to history.\n");
    assert_eq!(orch.context().ledger().all().await.unwrap().len(), 1);
}
