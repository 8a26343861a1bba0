//! Quota ledger: allowance checks and atomic usage commits.

use std::sync::Arc;

use chrono::{Duration, Utc};

use reword_core::{Allowance, Limits, ParaphraseEvent, UserAccount, UserId};
use reword_store::{Result, Store};

/// The quota authority.
///
/// Wraps the store's atomic counter operations with the configured limits
/// and the reporting event log. Allowance checks here are advisory reads
/// against a snapshot; the store's `commit_usage` remains the single writer
/// of the counters.
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn Store>,
    limits: Limits,
}

impl QuotaLedger {
    /// Create a ledger over `store` with the given limits.
    pub fn new(store: Arc<dyn Store>, limits: Limits) -> Self {
        Self { store, limits }
    }

    /// The configured limits.
    #[must_use]
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Fetch the user's account, creating a fresh one on first contact.
    pub fn get_or_create(
        &self,
        user_id: &UserId,
        username: Option<&str>,
        full_name: Option<&str>,
    ) -> Result<UserAccount> {
        let mut account = UserAccount::new(user_id.clone());
        account.username = username.map(str::to_owned);
        account.full_name = full_name.map(str::to_owned);
        self.store.create_account_if_absent(&account)
    }

    /// Decide whether `account` may generate `requested` paraphrases now.
    #[must_use]
    pub fn check_allowance(&self, account: &UserAccount, requested: u32) -> Allowance {
        self.limits
            .check_allowance(account, requested, Utc::now().date_naive())
    }

    /// Record `count` paraphrases against the user's counters and append
    /// the reporting events.
    ///
    /// The counter commit is atomic; the event append is reporting-only and
    /// must not fail the request, so its errors are logged and swallowed.
    pub fn commit_usage(&self, user_id: &UserId, count: u32) -> Result<UserAccount> {
        let now = Utc::now();
        let account = self.store.commit_usage(user_id, count, now.date_naive())?;

        let events = ParaphraseEvent::batch(user_id, count, now);
        if let Err(e) = self.store.record_events(&events) {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to append paraphrase events");
        }

        Ok(account)
    }

    /// Apply `amount` of referral credit by lowering today's counter.
    pub fn reduce_today_usage(&self, user_id: &UserId, amount: u32) -> Result<UserAccount> {
        self.store
            .reduce_today_usage(user_id, amount, Utc::now().date_naive())
    }

    /// Total number of known accounts.
    pub fn total_users(&self) -> Result<u64> {
        self.store.count_accounts()
    }

    /// Paraphrases generated in the trailing 24 hours.
    pub fn paraphrases_last_24h(&self) -> Result<u64> {
        self.store.count_events_since(Utc::now() - Duration::hours(24))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reword_store::RocksStore;
    use tempfile::TempDir;

    fn ledger() -> (QuotaLedger, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        (QuotaLedger::new(store, Limits::default()), dir)
    }

    #[test]
    fn get_or_create_captures_names_once() {
        let (ledger, _dir) = ledger();
        let user = UserId::new("u1");

        let account = ledger
            .get_or_create(&user, Some("alice"), Some("Alice A"))
            .unwrap();
        assert_eq!(account.username.as_deref(), Some("alice"));

        // Second contact returns the stored account untouched.
        let again = ledger.get_or_create(&user, Some("renamed"), None).unwrap();
        assert_eq!(again.username.as_deref(), Some("alice"));
    }

    #[test]
    fn commit_usage_updates_counters_and_events() {
        let (ledger, _dir) = ledger();
        let user = UserId::new("u1");

        let account = ledger.commit_usage(&user, 4).unwrap();
        assert_eq!(account.paraphrase_total, 4);
        assert_eq!(account.paraphrase_today, 4);

        assert_eq!(ledger.paraphrases_last_24h().unwrap(), 4);
        assert_eq!(ledger.total_users().unwrap(), 1);
    }

    #[test]
    fn allowance_reflects_committed_usage() {
        let (ledger, _dir) = ledger();
        let user = UserId::new("u1");

        let mut account = ledger.get_or_create(&user, None, None).unwrap();
        account.verified = true;
        assert_eq!(ledger.check_allowance(&account, 4), Allowance::Allowed);

        let mut account = ledger.commit_usage(&user, 20).unwrap();
        account.verified = true;
        assert_eq!(
            ledger.check_allowance(&account, 1),
            Allowance::DailyLimitExceeded
        );

        let account = ledger.reduce_today_usage(&user, 20).unwrap();
        assert_eq!(account.paraphrase_today, 0);
    }
}
