//! `RocksDB` storage layer for the reword paraphrase-bot backend.
//!
//! This crate provides persistent storage for user accounts, referrals,
//! paraphrase events, verification-message tracking, sessions, and admin
//! records using `RocksDB` with column families.
//!
//! # Atomicity
//!
//! Counter mutations (`commit_usage`, `reduce_today_usage`) and referral
//! creation are read-modify-write transactions serialized per user by the
//! store itself; multi-key writes go through a single `WriteBatch`. Callers
//! never implement their own retry loops: a store operation either applies
//! fully or returns an error.
//!
//! # Example
//!
//! ```no_run
//! use reword_store::{RocksStore, Store};
//! use reword_core::{UserAccount, UserId};
//!
//! let store = RocksStore::open("/tmp/reword-db").unwrap();
//!
//! let user_id = UserId::new("12345");
//! let account = store
//!     .create_account_if_absent(&UserAccount::new(user_id.clone()))
//!     .unwrap();
//! assert_eq!(account.paraphrase_total, 0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, NaiveDate, Utc};

use reword_core::{
    AdminRecord, ParaphraseEvent, ReferralId, ReferralRecord, Session, TrackingId, UserAccount,
    UserId, VerificationMessage,
};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Get an account by user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<UserAccount>>;

    /// Insert or update an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &UserAccount) -> Result<()>;

    /// Create the account if it does not exist; return the stored account
    /// either way. Serialized per user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn create_account_if_absent(&self, account: &UserAccount) -> Result<UserAccount>;

    /// Count all accounts. Eventually consistent snapshot, reporting only.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_accounts(&self) -> Result<u64>;

    // =========================================================================
    // Counter Operations (atomic per user)
    // =========================================================================

    /// Record `count` paraphrases for a user as one atomic transaction.
    ///
    /// If `last_paraphrase_date != today` the daily counter is reset to
    /// `count`, otherwise `count` is added; the lifetime counter always
    /// grows by `count`. Creates the account if it is missing. Returns the
    /// updated account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn commit_usage(&self, user_id: &UserId, count: u32, today: NaiveDate) -> Result<UserAccount>;

    /// Apply referral credit by lowering today's counter, saturating at
    /// zero, with the same lazy date rollover as `commit_usage`. Returns the
    /// updated account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn reduce_today_usage(
        &self,
        user_id: &UserId,
        amount: u32,
        today: NaiveDate,
    ) -> Result<UserAccount>;

    // =========================================================================
    // Invite Codes
    // =========================================================================

    /// Persist a user's invite code and its lookup index atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn set_invite_code(&self, user_id: &UserId, code: &str) -> Result<()>;

    /// Resolve an invite code to the user that owns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_user_by_invite_code(&self, code: &str) -> Result<Option<UserId>>;

    // =========================================================================
    // Referral Operations
    // =========================================================================

    /// Create a referred user's account, credit the inviter, and write the
    /// referral record plus its indexes as one atomic transaction.
    ///
    /// The inviter's lifetime counter grows by `bonus` and their invite
    /// count by one. Fails closed if the invited user already has an account
    /// or an existing referral record.
    ///
    /// # Errors
    ///
    /// - `StoreError::AlreadyReferred` if the invited user exists.
    /// - `StoreError::SelfReferral` if inviter and invitee are the same.
    /// - `StoreError::NotFound` if the inviter's account doesn't exist.
    fn create_referred_account(
        &self,
        new_account: &UserAccount,
        record: &ReferralRecord,
        bonus: u32,
    ) -> Result<()>;

    /// All unacknowledged referrals credited to an inviter, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn unacknowledged_referrals(&self, inviter_id: &UserId) -> Result<Vec<ReferralRecord>>;

    /// Mark the given referral records acknowledged in one batch.
    ///
    /// Only the listed records are touched, so a referral that arrives
    /// between fetch and acknowledgment is left for the next pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn acknowledge_referrals(&self, referral_ids: &[ReferralId], when: DateTime<Utc>)
        -> Result<()>;

    /// The referral record that created `new_user_id`'s account, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn referral_for_invitee(&self, new_user_id: &UserId) -> Result<Option<ReferralRecord>>;

    // =========================================================================
    // Paraphrase Events (reporting only)
    // =========================================================================

    /// Append a batch of paraphrase events.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_events(&self, events: &[ParaphraseEvent]) -> Result<()>;

    /// Count events at or after `since`. Eventually consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_events_since(&self, since: DateTime<Utc>) -> Result<u64>;

    // =========================================================================
    // Admin Records
    // =========================================================================

    /// Insert or update an admin record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_admin(&self, admin: &AdminRecord) -> Result<()>;

    /// List all admin records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_admins(&self) -> Result<Vec<AdminRecord>>;

    // =========================================================================
    // Verification-Message Tracking
    // =========================================================================

    /// Track a sent verification prompt for later deletion.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_verification_message(&self, message: &VerificationMessage) -> Result<()>;

    /// All tracking records whose expiry is at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn expired_verification_messages(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<VerificationMessage>>;

    /// Remove a tracking record once the transport has deleted the prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_verification_message(&self, tracking_id: &TrackingId) -> Result<()>;

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Insert or update a user's interactive session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_session(&self, user_id: &UserId, session: &Session) -> Result<()>;

    /// Get a user's interactive session, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_session(&self, user_id: &UserId) -> Result<Option<Session>>;

    /// Remove a user's interactive session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_session(&self, user_id: &UserId) -> Result<()>;
}
