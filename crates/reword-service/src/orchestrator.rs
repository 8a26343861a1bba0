//! Conversation flows, decoupled from any concrete chat transport.
//!
//! The orchestrator runs the quota gates and the generation pipeline and
//! emits [`Reply`] payloads through the [`ReplyChannel`] seam. The transport
//! adapter renders each payload (text, buttons, deep links) in whatever way
//! its platform supports and reports back the ids of sent messages so
//! verification prompts can be tracked for expiry.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use reword_core::{Allowance, Session, UserAccount, UserId, VerificationMessage};
use reword_gemini::GeminiClient;
use reword_store::{Store, StoreError};

use crate::config::ServiceConfig;
use crate::ledger::QuotaLedger;
use crate::referral::{ReferralEngine, ReferralOutcome};

/// Paraphrase counts a user may choose.
pub const ALLOWED_COUNTS: [u32; 3] = [1, 2, 4];

/// Count used by the add-more flow when the session has no recorded choice.
const DEFAULT_COUNT: u32 = 2;

/// A transport-neutral outgoing payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Plain text.
    Text(String),

    /// Ask the user how many paraphrases they want.
    CountPrompt {
        /// Prompt text.
        text: String,
        /// Selectable counts, in display order.
        choices: Vec<u32>,
    },

    /// The account must verify to continue; render `link` as a button.
    VerificationPrompt {
        /// Prompt text.
        text: String,
        /// External verification URL.
        link: String,
    },

    /// Daily limit reached; render share / try-again affordances.
    InvitePrompt {
        /// Prompt text.
        text: String,
        /// Deep link that applies the user's invite code.
        invite_link: String,
        /// Pre-composed message for the share affordance.
        share_text: String,
    },

    /// One generated paraphrase. `is_last` marks the final message of the
    /// batch, which carries the add-more / new-message affordances.
    Paraphrase {
        /// The paraphrase text.
        text: String,
        /// Whether this is the batch's final message.
        is_last: bool,
    },
}

/// Transport identifiers of a sent message, reported by the channel when
/// its platform exposes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    /// Chat the message was sent to.
    pub chat_id: i64,

    /// Message id within that chat.
    pub message_id: i64,
}

/// Error raised by a reply channel.
#[derive(Debug, thiserror::Error)]
#[error("reply channel error: {0}")]
pub struct ChannelError(pub String);

/// The seam between the orchestrator and the chat transport.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    /// Deliver one payload to the user this channel is bound to.
    ///
    /// Returns the sent message's transport ids when available; the
    /// orchestrator uses them to track verification prompts for deletion.
    async fn send(&self, reply: Reply) -> Result<Option<SentMessage>, ChannelError>;
}

/// Errors surfaced by orchestrator flows.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Storage failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The transport failed to deliver a payload.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Drives the conversation flows over the ledger, referral engine, and
/// generation client.
pub struct RequestOrchestrator {
    store: Arc<dyn Store>,
    ledger: QuotaLedger,
    referrals: ReferralEngine,
    gemini: Arc<GeminiClient>,
    bot_username: String,
    verification_link: String,
    session_ttl: Duration,
}

impl RequestOrchestrator {
    /// Build an orchestrator from the shared store, generation client, and
    /// configuration.
    pub fn new(store: Arc<dyn Store>, gemini: Arc<GeminiClient>, config: &ServiceConfig) -> Self {
        Self {
            ledger: QuotaLedger::new(store.clone(), config.limits),
            referrals: ReferralEngine::new(store.clone(), config.limits),
            store,
            gemini,
            bot_username: config.bot_username.clone(),
            verification_link: config.verification_link.clone(),
            session_ttl: Duration::seconds(config.session_ttl_seconds),
        }
    }

    /// First contact: create the account, apply a referral payload when one
    /// is present, and greet the user.
    ///
    /// Returns the referral outcome so the transport can notify the inviter
    /// in their own chat.
    pub async fn handle_start(
        &self,
        user_id: &UserId,
        username: Option<&str>,
        full_name: Option<&str>,
        invite_payload: Option<&str>,
        channel: &dyn ReplyChannel,
    ) -> Result<ReferralOutcome, OrchestratorError> {
        let mut account = UserAccount::new(user_id.clone());
        account.username = username.map(str::to_owned);
        account.full_name = full_name.map(str::to_owned);

        let mut outcome = ReferralOutcome {
            credited: false,
            inviter_id: None,
        };
        if let Some(code) = invite_payload {
            if self.store.get_account(user_id)?.is_none() {
                outcome = self.referrals.apply_referral(&account, code)?;
            }
        }

        // The referral path already created the account; this is a no-op
        // then, and the plain registration otherwise.
        self.store.create_account_if_absent(&account)?;

        channel
            .send(Reply::Text("Welcome! Send your message.".into()))
            .await?;
        Ok(outcome)
    }

    /// A plain text message: remember it and ask for the paraphrase count.
    pub async fn handle_text(
        &self,
        user_id: &UserId,
        text: &str,
        channel: &dyn ReplyChannel,
    ) -> Result<(), OrchestratorError> {
        let text = text.trim();
        if text.is_empty() {
            channel
                .send(Reply::Text(
                    "No message found. Send a message first using /start.".into(),
                ))
                .await?;
            return Ok(());
        }

        self.store.put_session(user_id, &Session::new(text))?;
        channel
            .send(Reply::CountPrompt {
                text: "How many paraphrased versions do you want?".into(),
                choices: ALLOWED_COUNTS.to_vec(),
            })
            .await?;
        Ok(())
    }

    /// The user picked a count for the message held in their session.
    pub async fn handle_count_choice(
        &self,
        user_id: &UserId,
        username: Option<&str>,
        full_name: Option<&str>,
        count: u32,
        channel: &dyn ReplyChannel,
    ) -> Result<(), OrchestratorError> {
        let Some(mut session) = self.load_session(user_id)? else {
            channel
                .send(Reply::Text(
                    "No message found. Send a message first using /start.".into(),
                ))
                .await?;
            return Ok(());
        };

        session.last_choice = Some(count);
        session.updated_at = Utc::now();
        self.store.put_session(user_id, &session)?;

        self.handle_paraphrase_request(user_id, username, full_name, &session.text, count, channel)
            .await
    }

    /// Repeat the last request with the same text and count.
    pub async fn handle_add_more(
        &self,
        user_id: &UserId,
        username: Option<&str>,
        full_name: Option<&str>,
        channel: &dyn ReplyChannel,
    ) -> Result<(), OrchestratorError> {
        let Some(session) = self.load_session(user_id)? else {
            channel
                .send(Reply::Text(
                    "No message found. Send a message first using /start.".into(),
                ))
                .await?;
            return Ok(());
        };

        let count = session.last_choice.unwrap_or(DEFAULT_COUNT);
        self.handle_paraphrase_request(user_id, username, full_name, &session.text, count, channel)
            .await
    }

    /// Drop the session and ask for fresh input.
    pub async fn handle_new_message(
        &self,
        user_id: &UserId,
        channel: &dyn ReplyChannel,
    ) -> Result<(), OrchestratorError> {
        self.store.delete_session(user_id)?;
        channel
            .send(Reply::Text("Send your new message.".into()))
            .await?;
        Ok(())
    }

    /// The try-again flow behind the daily-limit prompt: acknowledge any
    /// new referrals and convert them into allowance, or re-show the invite
    /// prompt when there are none.
    pub async fn handle_try_again(
        &self,
        user_id: &UserId,
        channel: &dyn ReplyChannel,
    ) -> Result<(), OrchestratorError> {
        let acknowledged = self.referrals.acknowledge_and_credit(user_id)?;
        if acknowledged > 0 {
            let earned = acknowledged * self.ledger.limits().referral_bonus;
            channel
                .send(Reply::Text(format!(
                    "\u{2705} You have invited {acknowledged} person(s). \
                     You've earned {earned} credits. Send your message to continue paraphrasing."
                )))
                .await?;
        } else {
            let prompt = self.invite_prompt(
                user_id,
                "\u{274c} No new invited users found. Please invite more friends \
                 and click \u{201c}Try Again\u{201d} again.",
            )?;
            channel.send(prompt).await?;
        }
        Ok(())
    }

    /// The core paraphrase flow: validate, run the quota gates, generate,
    /// emit, and commit.
    pub async fn handle_paraphrase_request(
        &self,
        user_id: &UserId,
        username: Option<&str>,
        full_name: Option<&str>,
        text: &str,
        count: u32,
        channel: &dyn ReplyChannel,
    ) -> Result<(), OrchestratorError> {
        if text.trim().is_empty() {
            channel
                .send(Reply::Text(
                    "No message found. Send a message first using /start.".into(),
                ))
                .await?;
            return Ok(());
        }
        if !ALLOWED_COUNTS.contains(&count) {
            channel
                .send(Reply::Text(
                    "Invalid number of paraphrases selected. Please try again.".into(),
                ))
                .await?;
            return Ok(());
        }

        let account = self.ledger.get_or_create(user_id, username, full_name)?;
        match self.ledger.check_allowance(&account, count) {
            Allowance::NeedsVerification => {
                let sent = channel
                    .send(Reply::VerificationPrompt {
                        text: "Please verify your account.".into(),
                        link: self.verification_link.clone(),
                    })
                    .await?;
                if let Some(sent) = sent {
                    self.store.put_verification_message(&VerificationMessage::new(
                        user_id.clone(),
                        sent.chat_id,
                        sent.message_id,
                    ))?;
                }
                return Ok(());
            }
            Allowance::DailyLimitExceeded => {
                let prompt = self.invite_prompt(
                    user_id,
                    "You've reached your daily limit! Invite others to continue.",
                )?;
                channel.send(prompt).await?;
                return Ok(());
            }
            Allowance::Allowed => {}
        }

        let paraphrases = self.gemini.generate(text, count as usize).await;
        let total = paraphrases.len();
        for (idx, paraphrase) in paraphrases.into_iter().enumerate() {
            channel
                .send(Reply::Paraphrase {
                    text: paraphrase,
                    is_last: idx + 1 == total,
                })
                .await?;
        }

        self.ledger.commit_usage(user_id, count)?;
        Ok(())
    }

    /// Build the invite prompt shown by the daily-limit and try-again flows.
    fn invite_prompt(&self, user_id: &UserId, text: &str) -> Result<Reply, StoreError> {
        let code = self.referrals.ensure_invite_code(user_id)?;
        let invite_link = format!("https://t.me/{}?start={code}", self.bot_username);
        let share_text = format!(
            "\u{2728} Your friend invited you to use the Paraphrase Bot!\nStart here: {invite_link}"
        );
        Ok(Reply::InvitePrompt {
            text: text.to_owned(),
            invite_link,
            share_text,
        })
    }

    /// Load the user's session, treating an expired one as absent.
    fn load_session(&self, user_id: &UserId) -> Result<Option<Session>, StoreError> {
        let Some(session) = self.store.get_session(user_id)? else {
            return Ok(None);
        };
        if session.is_expired(self.session_ttl, Utc::now()) {
            self.store.delete_session(user_id)?;
            return Ok(None);
        }
        Ok(Some(session))
    }
}
