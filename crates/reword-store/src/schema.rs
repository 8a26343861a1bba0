//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Index: invite code -> `user_id`. Value is the user id bytes.
    pub const INVITE_CODES: &str = "invite_codes";

    /// Referral records, keyed by `referral_id` (ULID).
    pub const REFERRALS: &str = "referrals";

    /// Index: referrals by inviter, keyed by `inviter_id || 0x00 || referral_id`.
    /// Value is empty (index only).
    pub const REFERRALS_BY_INVITER: &str = "referrals_by_inviter";

    /// Index: referral by invited user, keyed by `new_user_id`. Value is the
    /// referral id bytes. Its existence enforces one referral per invitee.
    pub const REFERRAL_BY_INVITEE: &str = "referral_by_invitee";

    /// Paraphrase events for reporting, keyed by `event_id` (ULID, so keys
    /// sort by time and windowed counts are range scans).
    pub const PARAPHRASE_EVENTS: &str = "paraphrase_events";

    /// Operator records, keyed by `user_id`.
    pub const ADMINS: &str = "admins";

    /// Verification prompt tracking records, keyed by `tracking_id` (ULID).
    pub const VERIFICATION_MESSAGES: &str = "verification_messages";

    /// Per-user interactive sessions, keyed by `user_id`.
    pub const SESSIONS: &str = "sessions";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::INVITE_CODES,
        cf::REFERRALS,
        cf::REFERRALS_BY_INVITER,
        cf::REFERRAL_BY_INVITEE,
        cf::PARAPHRASE_EVENTS,
        cf::ADMINS,
        cf::VERIFICATION_MESSAGES,
        cf::SESSIONS,
    ]
}
