//! Referral records and invite codes.

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::{ReferralId, UserId};

/// Length of the random suffix appended to invite codes.
const CODE_SUFFIX_LEN: usize = 4;

/// One referral event: `new_user_id` joined through `inviter_id`'s code.
///
/// At most one record ever exists per `new_user_id`; the store enforces this
/// by refusing to create the record when the new user already has an
/// account. A record is mutated exactly once, when the inviter's pending
/// referrals are acknowledged and credited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralRecord {
    /// Record id, time-ordered.
    pub id: ReferralId,

    /// The account that shared the invite code.
    pub inviter_id: UserId,

    /// The account created through the code.
    pub new_user_id: UserId,

    /// When the referral happened.
    pub created_at: DateTime<Utc>,

    /// Whether the inviter has been credited for this referral.
    pub acknowledged: bool,

    /// When the credit was applied, if it has been.
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl ReferralRecord {
    /// Create a new, unacknowledged referral record.
    #[must_use]
    pub fn new(inviter_id: UserId, new_user_id: UserId) -> Self {
        Self {
            id: ReferralId::generate(),
            inviter_id,
            new_user_id,
            created_at: Utc::now(),
            acknowledged: false,
            acknowledged_at: None,
        }
    }
}

/// Generate an invite code for a user.
///
/// The code embeds the user id, so codes for distinct users can never
/// collide; the random suffix only disambiguates regenerated codes for the
/// same user. Codes are not secrets.
#[must_use]
pub fn make_invite_code(user_id: &UserId) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("inv_{user_id}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_unacknowledged() {
        let record = ReferralRecord::new(UserId::new("inviter"), UserId::new("invitee"));
        assert!(!record.acknowledged);
        assert!(record.acknowledged_at.is_none());
    }

    #[test]
    fn invite_code_embeds_user_id() {
        let code = make_invite_code(&UserId::new("12345"));
        assert!(code.starts_with("inv_12345_"));
        assert_eq!(code.len(), "inv_12345_".len() + 4);
    }

    #[test]
    fn invite_codes_for_distinct_users_differ() {
        let a = make_invite_code(&UserId::new("a"));
        let b = make_invite_code(&UserId::new("b"));
        assert_ne!(a, b);
    }
}
