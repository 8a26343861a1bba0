//! Key encoding utilities for `RocksDB`.
//!
//! User ids are variable-length strings, so composite keys separate the id
//! from the trailing ULID with a `0x00` byte (user ids never contain NUL).

use reword_core::{EventId, ReferralId, TrackingId, UserId};

/// Separator between a variable-length user id and a fixed-size suffix.
const SEP: u8 = 0;

/// Create an account key from a user id.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create an invite-code index key.
#[must_use]
pub fn invite_code_key(code: &str) -> Vec<u8> {
    code.as_bytes().to_vec()
}

/// Create a referral record key.
#[must_use]
pub fn referral_key(referral_id: &ReferralId) -> Vec<u8> {
    referral_id.to_bytes().to_vec()
}

/// Create an inviter-referral index key.
///
/// Format: `inviter_id || 0x00 || referral_id (16 bytes)`. ULIDs are
/// time-ordered, so a prefix scan yields a user's referrals oldest first.
#[must_use]
pub fn inviter_referral_key(inviter_id: &UserId, referral_id: &ReferralId) -> Vec<u8> {
    let mut key = Vec::with_capacity(inviter_id.as_bytes().len() + 17);
    key.extend_from_slice(inviter_id.as_bytes());
    key.push(SEP);
    key.extend_from_slice(&referral_id.to_bytes());
    key
}

/// Create a prefix for iterating all referrals credited to an inviter.
#[must_use]
pub fn inviter_referrals_prefix(inviter_id: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(inviter_id.as_bytes().len() + 1);
    key.extend_from_slice(inviter_id.as_bytes());
    key.push(SEP);
    key
}

/// Extract the referral id from an inviter-referral index key.
///
/// # Panics
///
/// Panics if the key is shorter than 16 bytes.
#[must_use]
pub fn extract_referral_id_from_inviter_key(key: &[u8]) -> ReferralId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[key.len() - 16..]);
    ReferralId::from_bytes(bytes)
}

/// Create an invitee index key (one referral per invited user).
#[must_use]
pub fn invitee_key(new_user_id: &UserId) -> Vec<u8> {
    new_user_id.as_bytes().to_vec()
}

/// Create a paraphrase event key.
#[must_use]
pub fn event_key(event_id: &EventId) -> Vec<u8> {
    event_id.to_bytes().to_vec()
}

/// Create an admin record key.
#[must_use]
pub fn admin_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a verification-message tracking key.
#[must_use]
pub fn verification_message_key(tracking_id: &TrackingId) -> Vec<u8> {
    tracking_id.to_bytes().to_vec()
}

/// Create a session key from a user id.
#[must_use]
pub fn session_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inviter_referral_key_format() {
        let inviter = UserId::new("user-1");
        let referral_id = ReferralId::generate();
        let key = inviter_referral_key(&inviter, &referral_id);

        assert_eq!(key.len(), inviter.as_bytes().len() + 1 + 16);
        assert!(key.starts_with(&inviter_referrals_prefix(&inviter)));
        assert_eq!(extract_referral_id_from_inviter_key(&key), referral_id);
    }

    #[test]
    fn prefixes_for_distinct_inviters_do_not_collide() {
        // "user-1" must not be treated as a prefix of "user-12"'s entries.
        let a = inviter_referrals_prefix(&UserId::new("user-1"));
        let key = inviter_referral_key(&UserId::new("user-12"), &ReferralId::generate());
        assert!(!key.starts_with(&a));
    }

    #[test]
    fn event_key_length() {
        let key = event_key(&EventId::generate());
        assert_eq!(key.len(), 16);
    }
}
