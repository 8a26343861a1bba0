//! HTTP endpoint integration tests.

mod common;

use chrono::Utc;

use common::TestHarness;
use reword_core::{ParaphraseEvent, UserAccount, UserId};
use reword_store::Store;

#[tokio::test]
async fn health_check_returns_ok() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "reword");
}

#[tokio::test]
async fn stats_start_empty() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/stats").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_users"], 0);
    assert_eq!(body["paraphrases_last_24h"], 0);
}

#[tokio::test]
async fn stats_reflect_accounts_and_events() {
    let harness = TestHarness::new();

    let user = UserId::new("u1");
    harness
        .store
        .create_account_if_absent(&UserAccount::new(user.clone()))
        .unwrap();
    harness
        .store
        .record_events(&ParaphraseEvent::batch(&user, 3, Utc::now()))
        .unwrap();

    let response = harness.server.get("/v1/stats").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_users"], 1);
    assert_eq!(body["paraphrases_last_24h"], 3);
}
