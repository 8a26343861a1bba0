//! User accounts and usage limits.
//!
//! An account carries the lifetime and per-day paraphrase counters, the
//! verification flag, and the referral fields. The daily counter resets
//! lazily: nothing touches it at midnight, instead every read and commit
//! interprets it against `last_paraphrase_date`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

// ============================================================================
// Constants
// ============================================================================

/// Lifetime paraphrases an unverified account may use before being gated.
pub const DEFAULT_VERIFICATION_THRESHOLD: u32 = 10;

/// Maximum paraphrases per calendar day per account.
pub const DEFAULT_DAILY_LIMIT: u32 = 20;

/// Credit granted to an inviter per newly onboarded referred user.
pub const DEFAULT_REFERRAL_BONUS: u32 = 20;

/// A user account with usage counters and referral state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    /// The transport-assigned user id.
    pub user_id: UserId,

    /// Username reported by the transport, if any.
    pub username: Option<String>,

    /// Display name reported by the transport, if any.
    pub full_name: Option<String>,

    /// Whether the account passed external verification.
    pub verified: bool,

    /// Lifetime paraphrase count.
    pub paraphrase_total: u32,

    /// Paraphrases on `last_paraphrase_date`. Meaningless for other days.
    pub paraphrase_today: u32,

    /// Calendar day `paraphrase_today` refers to.
    pub last_paraphrase_date: Option<NaiveDate>,

    /// Invite code assigned lazily on first share; unique across accounts.
    pub invite_code: Option<String>,

    /// Who invited this account. Set at most once, never reassigned.
    pub inviter_id: Option<UserId>,

    /// Referrals credited to this account.
    pub invites: u32,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    /// Create a new account with zero counters.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            username: None,
            full_name: None,
            verified: false,
            paraphrase_total: 0,
            paraphrase_today: 0,
            last_paraphrase_date: None,
            invite_code: None,
            inviter_id: None,
            invites: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Paraphrases used on `today`, accounting for the lazy date rollover.
    ///
    /// If the stored date is not `today`, the stored counter belongs to an
    /// earlier day and today's usage is zero.
    #[must_use]
    pub fn used_on(&self, today: NaiveDate) -> u32 {
        if self.last_paraphrase_date == Some(today) {
            self.paraphrase_today
        } else {
            0
        }
    }
}

/// Configured usage limits.
///
/// All three values are externally overridable; the defaults match the
/// product defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limits {
    /// Lifetime count after which an unverified account is gated.
    pub verification_threshold: u32,

    /// Maximum paraphrases per calendar day.
    pub daily_limit: u32,

    /// Credit granted per successful referral.
    pub referral_bonus: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            verification_threshold: DEFAULT_VERIFICATION_THRESHOLD,
            daily_limit: DEFAULT_DAILY_LIMIT,
            referral_bonus: DEFAULT_REFERRAL_BONUS,
        }
    }
}

/// Outcome of an allowance check for a requested paraphrase count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowance {
    /// The request may proceed.
    Allowed,

    /// The account must verify before continuing.
    NeedsVerification,

    /// The request would exceed the daily limit.
    DailyLimitExceeded,
}

impl Limits {
    /// Decide whether `account` may generate `requested` paraphrases today.
    ///
    /// The verification gate takes precedence over the daily limit. This is
    /// an advisory check against a snapshot; `commit_usage` in the store is
    /// the sole atomic authority over the counters.
    #[must_use]
    pub fn check_allowance(
        &self,
        account: &UserAccount,
        requested: u32,
        today: NaiveDate,
    ) -> Allowance {
        if !account.verified && account.paraphrase_total >= self.verification_threshold {
            return Allowance::NeedsVerification;
        }
        if account.used_on(today) + requested > self.daily_limit {
            return Allowance::DailyLimitExceeded;
        }
        Allowance::Allowed
    }
}
