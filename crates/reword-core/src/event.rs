//! Reporting events, verification-message tracking, sessions, and admins.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{EventId, TrackingId, UserId};

/// One unit of generated output, kept for aggregate reporting only.
///
/// Events are append-only and read through time-windowed scans; they are
/// never load-bearing for quota decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParaphraseEvent {
    /// Event id, time-ordered.
    pub id: EventId,

    /// The user the paraphrase was generated for.
    pub user_id: UserId,

    /// When it was generated.
    pub timestamp: DateTime<Utc>,
}

impl ParaphraseEvent {
    /// Build a batch of `count` events for one successful generation.
    #[must_use]
    pub fn batch(user_id: &UserId, count: u32, timestamp: DateTime<Utc>) -> Vec<Self> {
        (0..count)
            .map(|_| Self {
                id: EventId::generate(),
                user_id: user_id.clone(),
                timestamp,
            })
            .collect()
    }
}

/// A sent verification prompt, tracked so the transport can delete it after
/// it expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMessage {
    /// Tracking record id.
    pub id: TrackingId,

    /// The user the prompt was sent to.
    pub user_id: UserId,

    /// Transport chat id the prompt lives in.
    pub chat_id: i64,

    /// Transport message id of the prompt.
    pub message_id: i64,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the prompt should be deleted.
    pub expires_at: DateTime<Utc>,
}

impl VerificationMessage {
    /// Default lifetime of a verification prompt.
    pub const DEFAULT_TTL_HOURS: i64 = 24;

    /// Track a newly sent verification prompt with the default lifetime.
    #[must_use]
    pub fn new(user_id: UserId, chat_id: i64, message_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: TrackingId::generate(),
            user_id,
            chat_id,
            message_id,
            created_at: now,
            expires_at: now + Duration::hours(Self::DEFAULT_TTL_HOURS),
        }
    }

    /// Whether the prompt is due for deletion.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Per-user interactive session: last submitted text and last chosen count.
///
/// Sessions live in the document store with an explicit TTL so they survive
/// process restarts, replacing process-local maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The last text the user submitted for paraphrasing.
    pub text: String,

    /// The paraphrase count the user last chose, if any.
    pub last_choice: Option<u32>,

    /// Last write time, used for TTL expiry.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a session holding freshly submitted text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            last_choice: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether the session is older than `ttl` as of `now`.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.updated_at + ttl <= now
    }
}

/// An operator account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRecord {
    /// The admin's user id.
    pub user_id: UserId,

    /// Human-readable name shown in admin listings.
    pub display_name: String,

    /// When the admin was registered.
    pub created_at: DateTime<Utc>,
}

impl AdminRecord {
    /// Register an admin.
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_batch_size_and_owner() {
        let user_id = UserId::new("u1");
        let now = Utc::now();
        let events = ParaphraseEvent::batch(&user_id, 4, now);
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.user_id == user_id));
        assert!(events.iter().all(|e| e.timestamp == now));
    }

    #[test]
    fn verification_message_expiry() {
        let msg = VerificationMessage::new(UserId::new("u1"), 100, 200);
        assert!(!msg.is_expired(Utc::now()));
        assert!(msg.is_expired(Utc::now() + Duration::hours(25)));
    }

    #[test]
    fn session_ttl() {
        let session = Session::new("hello");
        let ttl = Duration::minutes(30);
        assert!(!session.is_expired(ttl, Utc::now()));
        assert!(session.is_expired(ttl, Utc::now() + Duration::hours(1)));
    }
}
