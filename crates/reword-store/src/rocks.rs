//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store`
//! trait. Per-user read-modify-write sequences are serialized by a lock
//! table keyed by user id; multi-key writes use a single `WriteBatch` so
//! they apply atomically.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use ulid::Ulid;

use reword_core::{
    AdminRecord, ParaphraseEvent, ReferralId, ReferralRecord, Session, TrackingId, UserAccount,
    UserId, VerificationMessage,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// Lock table serializing read-modify-write sequences per user.
#[derive(Default)]
struct UserLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    fn lock_for(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(user_id.as_str().to_owned())
            .or_default()
            .clone()
    }
}

fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    locks: UserLocks,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::debug!(path = %path.display(), "Opened RocksDB store");

        Ok(Self {
            db: Arc::new(db),
            locks: UserLocks::default(),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_cf<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_cf<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let value = Self::serialize(value)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Load the account, apply `mutate`, and store the result, all under
    /// the user's lock. `mutate` receives `None` when the account is
    /// missing and may create it by returning an account.
    fn mutate_account<F>(&self, user_id: &UserId, mutate: F) -> Result<UserAccount>
    where
        F: FnOnce(Option<UserAccount>) -> Result<UserAccount>,
    {
        let lock = self.locks.lock_for(user_id);
        let _guard = acquire(&lock);

        let current = self.get_cf(cf::ACCOUNTS, &keys::account_key(user_id))?;
        let mut updated = mutate(current)?;
        updated.updated_at = Utc::now();
        self.put_cf(cf::ACCOUNTS, &keys::account_key(user_id), &updated)?;
        Ok(updated)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn get_account(&self, user_id: &UserId) -> Result<Option<UserAccount>> {
        self.get_cf(cf::ACCOUNTS, &keys::account_key(user_id))
    }

    fn put_account(&self, account: &UserAccount) -> Result<()> {
        self.put_cf(cf::ACCOUNTS, &keys::account_key(&account.user_id), account)
    }

    fn create_account_if_absent(&self, account: &UserAccount) -> Result<UserAccount> {
        let lock = self.locks.lock_for(&account.user_id);
        let _guard = acquire(&lock);

        let key = keys::account_key(&account.user_id);
        if let Some(existing) = self.get_cf(cf::ACCOUNTS, &key)? {
            return Ok(existing);
        }
        self.put_cf(cf::ACCOUNTS, &key, account)?;
        Ok(account.clone())
    }

    fn count_accounts(&self) -> Result<u64> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let mut count = 0u64;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item.map_err(|e| StoreError::Database(e.to_string()))?;
            count += 1;
        }
        Ok(count)
    }

    // =========================================================================
    // Counter Operations
    // =========================================================================

    fn commit_usage(&self, user_id: &UserId, count: u32, today: NaiveDate) -> Result<UserAccount> {
        self.mutate_account(user_id, |current| {
            let mut account =
                current.unwrap_or_else(|| UserAccount::new(user_id.clone()));
            if account.last_paraphrase_date == Some(today) {
                account.paraphrase_today += count;
            } else {
                account.paraphrase_today = count;
            }
            account.paraphrase_total += count;
            account.last_paraphrase_date = Some(today);
            Ok(account)
        })
    }

    fn reduce_today_usage(
        &self,
        user_id: &UserId,
        amount: u32,
        today: NaiveDate,
    ) -> Result<UserAccount> {
        self.mutate_account(user_id, |current| {
            let mut account = current.ok_or(StoreError::NotFound)?;
            if account.last_paraphrase_date != Some(today) {
                account.paraphrase_today = 0;
                account.last_paraphrase_date = Some(today);
            }
            account.paraphrase_today = account.paraphrase_today.saturating_sub(amount);
            Ok(account)
        })
    }

    // =========================================================================
    // Invite Codes
    // =========================================================================

    fn set_invite_code(&self, user_id: &UserId, code: &str) -> Result<()> {
        let lock = self.locks.lock_for(user_id);
        let _guard = acquire(&lock);

        let key = keys::account_key(user_id);
        let mut account: UserAccount =
            self.get_cf(cf::ACCOUNTS, &key)?.ok_or(StoreError::NotFound)?;
        account.invite_code = Some(code.to_owned());
        account.updated_at = Utc::now();

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_codes = self.cf(cf::INVITE_CODES)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_accounts, &key, Self::serialize(&account)?);
        batch.put_cf(
            &cf_codes,
            keys::invite_code_key(code),
            user_id.as_bytes(),
        );
        self.write(batch)
    }

    fn find_user_by_invite_code(&self, code: &str) -> Result<Option<UserId>> {
        let cf = self.cf(cf::INVITE_CODES)?;
        let value = self
            .db
            .get_cf(&cf, keys::invite_code_key(code))
            .map_err(|e| StoreError::Database(e.to_string()))?;
        match value {
            Some(bytes) => {
                let id = String::from_utf8(bytes)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(UserId::new(id)))
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // Referral Operations
    // =========================================================================

    fn create_referred_account(
        &self,
        new_account: &UserAccount,
        record: &ReferralRecord,
        bonus: u32,
    ) -> Result<()> {
        let inviter_id = &record.inviter_id;
        let new_user_id = &new_account.user_id;

        if inviter_id == new_user_id {
            return Err(StoreError::SelfReferral {
                user_id: new_user_id.to_string(),
            });
        }

        // Both accounts are mutated; take the locks in a stable order so
        // two concurrent referrals between the same pair cannot deadlock.
        let (first, second) = if inviter_id.as_str() <= new_user_id.as_str() {
            (inviter_id, new_user_id)
        } else {
            (new_user_id, inviter_id)
        };
        let first_lock = self.locks.lock_for(first);
        let second_lock = self.locks.lock_for(second);
        let _first_guard = acquire(&first_lock);
        let _second_guard = acquire(&second_lock);

        let new_key = keys::account_key(new_user_id);
        if self.get_cf::<UserAccount>(cf::ACCOUNTS, &new_key)?.is_some() {
            return Err(StoreError::AlreadyReferred {
                user_id: new_user_id.to_string(),
            });
        }
        let cf_invitee = self.cf(cf::REFERRAL_BY_INVITEE)?;
        let invitee_key = keys::invitee_key(new_user_id);
        let already = self
            .db
            .get_cf(&cf_invitee, &invitee_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if already {
            return Err(StoreError::AlreadyReferred {
                user_id: new_user_id.to_string(),
            });
        }

        let inviter_key = keys::account_key(inviter_id);
        let mut inviter: UserAccount = self
            .get_cf(cf::ACCOUNTS, &inviter_key)?
            .ok_or(StoreError::NotFound)?;
        inviter.paraphrase_total += bonus;
        inviter.invites += 1;
        inviter.updated_at = Utc::now();

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_referrals = self.cf(cf::REFERRALS)?;
        let cf_by_inviter = self.cf(cf::REFERRALS_BY_INVITER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_accounts, &new_key, Self::serialize(new_account)?);
        batch.put_cf(&cf_accounts, &inviter_key, Self::serialize(&inviter)?);
        batch.put_cf(
            &cf_referrals,
            keys::referral_key(&record.id),
            Self::serialize(record)?,
        );
        batch.put_cf(
            &cf_by_inviter,
            keys::inviter_referral_key(inviter_id, &record.id),
            b"",
        );
        batch.put_cf(&cf_invitee, &invitee_key, record.id.to_bytes());
        self.write(batch)
    }

    fn unacknowledged_referrals(&self, inviter_id: &UserId) -> Result<Vec<ReferralRecord>> {
        let cf_by_inviter = self.cf(cf::REFERRALS_BY_INVITER)?;
        let prefix = keys::inviter_referrals_prefix(inviter_id);

        let mut records = Vec::new();
        let iter = self.db.iterator_cf(
            &cf_by_inviter,
            IteratorMode::From(&prefix, Direction::Forward),
        );
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let referral_id = keys::extract_referral_id_from_inviter_key(&key);
            if let Some(record) =
                self.get_cf::<ReferralRecord>(cf::REFERRALS, &keys::referral_key(&referral_id))?
            {
                if !record.acknowledged {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    fn acknowledge_referrals(
        &self,
        referral_ids: &[ReferralId],
        when: DateTime<Utc>,
    ) -> Result<()> {
        let cf_referrals = self.cf(cf::REFERRALS)?;
        let mut batch = WriteBatch::default();
        for referral_id in referral_ids {
            let key = keys::referral_key(referral_id);
            let Some(mut record) = self.get_cf::<ReferralRecord>(cf::REFERRALS, &key)? else {
                continue;
            };
            if record.acknowledged {
                continue;
            }
            record.acknowledged = true;
            record.acknowledged_at = Some(when);
            batch.put_cf(&cf_referrals, &key, Self::serialize(&record)?);
        }
        self.write(batch)
    }

    fn referral_for_invitee(&self, new_user_id: &UserId) -> Result<Option<ReferralRecord>> {
        let cf_invitee = self.cf(cf::REFERRAL_BY_INVITEE)?;
        let value = self
            .db
            .get_cf(&cf_invitee, keys::invitee_key(new_user_id))
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let Some(bytes) = value else {
            return Ok(None);
        };
        if bytes.len() != 16 {
            return Err(StoreError::Serialization(
                "invitee index value is not a referral id".into(),
            ));
        }
        let mut id_bytes = [0u8; 16];
        id_bytes.copy_from_slice(&bytes);
        let referral_id = ReferralId::from_bytes(id_bytes);
        self.get_cf(cf::REFERRALS, &keys::referral_key(&referral_id))
    }

    // =========================================================================
    // Paraphrase Events
    // =========================================================================

    fn record_events(&self, events: &[ParaphraseEvent]) -> Result<()> {
        let cf_events = self.cf(cf::PARAPHRASE_EVENTS)?;
        let mut batch = WriteBatch::default();
        for event in events {
            batch.put_cf(
                &cf_events,
                keys::event_key(&event.id),
                Self::serialize(event)?,
            );
        }
        self.write(batch)
    }

    fn count_events_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let cf_events = self.cf(cf::PARAPHRASE_EVENTS)?;

        // Event keys are ULIDs, so seeking to a ULID with the window's
        // timestamp and a zero random part lands on the first event in the
        // window.
        let since_ms = u64::try_from(since.timestamp_millis().max(0))
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let seek = Ulid::from_parts(since_ms, 0).to_bytes();

        let mut count = 0u64;
        let iter = self
            .db
            .iterator_cf(&cf_events, IteratorMode::From(&seek, Direction::Forward));
        for item in iter {
            item.map_err(|e| StoreError::Database(e.to_string()))?;
            count += 1;
        }
        Ok(count)
    }

    // =========================================================================
    // Admin Records
    // =========================================================================

    fn put_admin(&self, admin: &AdminRecord) -> Result<()> {
        self.put_cf(cf::ADMINS, &keys::admin_key(&admin.user_id), admin)
    }

    fn list_admins(&self) -> Result<Vec<AdminRecord>> {
        let cf_admins = self.cf(cf::ADMINS)?;
        let mut admins = Vec::new();
        for item in self.db.iterator_cf(&cf_admins, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            admins.push(Self::deserialize(&value)?);
        }
        Ok(admins)
    }

    // =========================================================================
    // Verification-Message Tracking
    // =========================================================================

    fn put_verification_message(&self, message: &VerificationMessage) -> Result<()> {
        self.put_cf(
            cf::VERIFICATION_MESSAGES,
            &keys::verification_message_key(&message.id),
            message,
        )
    }

    fn expired_verification_messages(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<VerificationMessage>> {
        let cf_messages = self.cf(cf::VERIFICATION_MESSAGES)?;
        let mut expired = Vec::new();
        for item in self.db.iterator_cf(&cf_messages, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let message: VerificationMessage = Self::deserialize(&value)?;
            if message.is_expired(now) {
                expired.push(message);
            }
        }
        Ok(expired)
    }

    fn delete_verification_message(&self, tracking_id: &TrackingId) -> Result<()> {
        let cf_messages = self.cf(cf::VERIFICATION_MESSAGES)?;
        self.db
            .delete_cf(&cf_messages, keys::verification_message_key(tracking_id))
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    fn put_session(&self, user_id: &UserId, session: &Session) -> Result<()> {
        self.put_cf(cf::SESSIONS, &keys::session_key(user_id), session)
    }

    fn get_session(&self, user_id: &UserId) -> Result<Option<Session>> {
        self.get_cf(cf::SESSIONS, &keys::session_key(user_id))
    }

    fn delete_session(&self, user_id: &UserId) -> Result<()> {
        let cf_sessions = self.cf(cf::SESSIONS)?;
        self.db
            .delete_cf(&cf_sessions, keys::session_key(user_id))
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
