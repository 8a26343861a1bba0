//! Conversation-flow integration tests driving the orchestrator end to end
//! against a real store and a mocked Gemini endpoint.

mod common;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reword_core::{Session, UserAccount, UserId, PARAPHRASE_SEPARATOR};
use reword_gemini::{GeminiClient, DEFAULT_MODEL};
use reword_service::{
    ChannelError, ReferralEngine, Reply, ReplyChannel, RequestOrchestrator, SentMessage,
};
use reword_store::{RocksStore, Store};

/// A reply channel that records every payload and fabricates message ids.
#[derive(Default)]
struct RecordingChannel {
    replies: Mutex<Vec<Reply>>,
    next_message_id: AtomicI64,
}

impl RecordingChannel {
    fn take(&self) -> Vec<Reply> {
        std::mem::take(&mut self.replies.lock().unwrap())
    }
}

#[async_trait]
impl ReplyChannel for RecordingChannel {
    async fn send(&self, reply: Reply) -> Result<Option<SentMessage>, ChannelError> {
        self.replies.lock().unwrap().push(reply);
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        Ok(Some(SentMessage {
            chat_id: 7,
            message_id,
        }))
    }
}

struct Fixture {
    orchestrator: RequestOrchestrator,
    store: Arc<RocksStore>,
    channel: RecordingChannel,
    _temp_dir: TempDir,
}

async fn fixture(gemini_base_url: &str) -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(RocksStore::open(temp_dir.path()).unwrap());
    let config = common::test_config(&temp_dir.path().to_string_lossy());
    let gemini = Arc::new(
        GeminiClient::with_base_url(gemini_base_url, vec!["test-key".into()]).unwrap(),
    );
    let orchestrator = RequestOrchestrator::new(store.clone(), gemini, &config);
    Fixture {
        orchestrator,
        store,
        channel: RecordingChannel::default(),
        _temp_dir: temp_dir,
    }
}

fn generate_path() -> String {
    format!("/v1beta/models/{DEFAULT_MODEL}:generateContent")
}

fn candidate_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    })
}

#[tokio::test]
async fn text_then_choice_generates_and_commits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body(&format!(
            "First version{PARAPHRASE_SEPARATOR}Second version"
        ))))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&server.uri()).await;
    let user = UserId::new("u1");

    fx.orchestrator
        .handle_text(&user, "Hello world", &fx.channel)
        .await
        .unwrap();
    let replies = fx.channel.take();
    assert!(matches!(&replies[..], [Reply::CountPrompt { choices, .. }] if choices == &[1, 2, 4]));

    fx.orchestrator
        .handle_count_choice(&user, Some("alice"), None, 2, &fx.channel)
        .await
        .unwrap();

    let replies = fx.channel.take();
    assert_eq!(
        replies,
        vec![
            Reply::Paraphrase {
                text: "First version".into(),
                is_last: false
            },
            Reply::Paraphrase {
                text: "Second version".into(),
                is_last: true
            },
        ]
    );

    let account = fx.store.get_account(&user).unwrap().unwrap();
    assert_eq!(account.paraphrase_total, 2);
    assert_eq!(account.paraphrase_today, 2);
    assert_eq!(account.username.as_deref(), Some("alice"));

    let session = fx.store.get_session(&user).unwrap().unwrap();
    assert_eq!(session.last_choice, Some(2));
}

#[tokio::test]
async fn verification_gate_blocks_generation_and_tracks_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let fx = fixture(&server.uri()).await;
    let user = UserId::new("u1");

    let mut account = UserAccount::new(user.clone());
    account.paraphrase_total = 10;
    fx.store.put_account(&account).unwrap();

    fx.orchestrator
        .handle_paraphrase_request(&user, None, None, "Hello", 2, &fx.channel)
        .await
        .unwrap();

    let replies = fx.channel.take();
    assert!(matches!(
        &replies[..],
        [Reply::VerificationPrompt { link, .. }] if link == "https://example.com/verify"
    ));

    // The prompt is tracked for the 24-hour sweep.
    let tracked = fx
        .store
        .expired_verification_messages(Utc::now() + Duration::hours(25))
        .unwrap();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].user_id, user);
    assert_eq!(tracked[0].chat_id, 7);

    // No usage was committed.
    let account = fx.store.get_account(&user).unwrap().unwrap();
    assert_eq!(account.paraphrase_total, 10);
}

#[tokio::test]
async fn daily_limit_shows_invite_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let fx = fixture(&server.uri()).await;
    let user = UserId::new("u1");

    let mut account = UserAccount::new(user.clone());
    account.verified = true;
    fx.store.put_account(&account).unwrap();
    fx.store
        .commit_usage(&user, 20, Utc::now().date_naive())
        .unwrap();

    fx.orchestrator
        .handle_paraphrase_request(&user, None, None, "Hello", 1, &fx.channel)
        .await
        .unwrap();

    let replies = fx.channel.take();
    let [Reply::InvitePrompt {
        invite_link,
        share_text,
        ..
    }] = &replies[..]
    else {
        panic!("expected an invite prompt, got {replies:?}");
    };
    assert!(invite_link.starts_with("https://t.me/ParaphraseBot?start=inv_u1_"));
    assert!(share_text.contains(invite_link.as_str()));

    let account = fx.store.get_account(&user).unwrap().unwrap();
    assert_eq!(account.paraphrase_total, 20);
}

#[tokio::test]
async fn invalid_count_and_missing_session_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let fx = fixture(&server.uri()).await;
    let user = UserId::new("u1");

    fx.orchestrator
        .handle_paraphrase_request(&user, None, None, "Hello", 3, &fx.channel)
        .await
        .unwrap();
    let replies = fx.channel.take();
    assert!(matches!(
        &replies[..],
        [Reply::Text(text)] if text.contains("Invalid number of paraphrases")
    ));

    fx.orchestrator
        .handle_count_choice(&user, None, None, 2, &fx.channel)
        .await
        .unwrap();
    let replies = fx.channel.take();
    assert!(matches!(
        &replies[..],
        [Reply::Text(text)] if text.contains("No message found")
    ));
}

#[tokio::test]
async fn referral_start_and_try_again_restore_allowance() {
    let server = MockServer::start().await;
    let fx = fixture(&server.uri()).await;

    let inviter = UserId::new("inviter");
    let engine = ReferralEngine::new(fx.store.clone(), reword_core::Limits::default());
    let code = engine.ensure_invite_code(&inviter).unwrap();

    // Inviter has exhausted today's allowance.
    fx.store
        .commit_usage(&inviter, 20, Utc::now().date_naive())
        .unwrap();

    // A newcomer joins through the invite link.
    let newcomer = UserId::new("newbie");
    let outcome = fx
        .orchestrator
        .handle_start(&newcomer, Some("newbie"), None, Some(&code), &fx.channel)
        .await
        .unwrap();
    assert!(outcome.credited);
    assert_eq!(outcome.inviter_id, Some(inviter.clone()));
    let replies = fx.channel.take();
    assert!(matches!(&replies[..], [Reply::Text(text)] if text.starts_with("Welcome")));

    // Try Again acknowledges the referral and restores allowance.
    fx.orchestrator
        .handle_try_again(&inviter, &fx.channel)
        .await
        .unwrap();
    let replies = fx.channel.take();
    assert!(matches!(
        &replies[..],
        [Reply::Text(text)] if text.contains("invited 1 person(s)") && text.contains("20 credits")
    ));

    let account = fx.store.get_account(&inviter).unwrap().unwrap();
    assert_eq!(account.paraphrase_today, 0);
    assert_eq!(account.invites, 1);

    // A second Try Again finds nothing and re-shows the invite prompt.
    fx.orchestrator
        .handle_try_again(&inviter, &fx.channel)
        .await
        .unwrap();
    let replies = fx.channel.take();
    assert!(matches!(&replies[..], [Reply::InvitePrompt { .. }]));
}

#[tokio::test]
async fn add_more_repeats_last_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(candidate_body("Only one version")),
        )
        .expect(2)
        .mount(&server)
        .await;

    let fx = fixture(&server.uri()).await;
    let user = UserId::new("u1");

    fx.orchestrator
        .handle_text(&user, "Hello world", &fx.channel)
        .await
        .unwrap();
    fx.orchestrator
        .handle_count_choice(&user, None, None, 1, &fx.channel)
        .await
        .unwrap();
    fx.channel.take();

    fx.orchestrator
        .handle_add_more(&user, None, None, &fx.channel)
        .await
        .unwrap();
    let replies = fx.channel.take();
    assert_eq!(
        replies,
        vec![Reply::Paraphrase {
            text: "Only one version".into(),
            is_last: true
        }]
    );

    let account = fx.store.get_account(&user).unwrap().unwrap();
    assert_eq!(account.paraphrase_total, 2);
}

#[tokio::test]
async fn expired_session_is_treated_as_absent() {
    let server = MockServer::start().await;
    let fx = fixture(&server.uri()).await;
    let user = UserId::new("u1");

    let mut session = Session::new("old text");
    session.last_choice = Some(2);
    session.updated_at = Utc::now() - Duration::days(2);
    fx.store.put_session(&user, &session).unwrap();

    fx.orchestrator
        .handle_add_more(&user, None, None, &fx.channel)
        .await
        .unwrap();

    let replies = fx.channel.take();
    assert!(matches!(
        &replies[..],
        [Reply::Text(text)] if text.contains("No message found")
    ));
    assert!(fx.store.get_session(&user).unwrap().is_none());
}

#[tokio::test]
async fn new_message_clears_session() {
    let server = MockServer::start().await;
    let fx = fixture(&server.uri()).await;
    let user = UserId::new("u1");

    fx.orchestrator
        .handle_text(&user, "Hello world", &fx.channel)
        .await
        .unwrap();
    fx.channel.take();

    fx.orchestrator
        .handle_new_message(&user, &fx.channel)
        .await
        .unwrap();

    let replies = fx.channel.take();
    assert!(matches!(
        &replies[..],
        [Reply::Text(text)] if text == "Send your new message."
    ));
    assert!(fx.store.get_session(&user).unwrap().is_none());
}
