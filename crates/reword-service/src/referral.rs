//! Referral engine: invite codes, referral crediting, acknowledgment.

use std::sync::Arc;

use chrono::Utc;

use reword_core::{make_invite_code, Limits, ReferralRecord, UserAccount, UserId};
use reword_store::{Result, Store, StoreError};

/// Outcome of applying an invite code at account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralOutcome {
    /// Whether the inviter was credited for this referral.
    pub credited: bool,

    /// The inviter, when the code resolved to one.
    pub inviter_id: Option<UserId>,
}

impl ReferralOutcome {
    fn not_credited() -> Self {
        Self {
            credited: false,
            inviter_id: None,
        }
    }
}

/// Referral flows over the store's atomic referral operations.
#[derive(Clone)]
pub struct ReferralEngine {
    store: Arc<dyn Store>,
    limits: Limits,
}

impl ReferralEngine {
    /// Create an engine over `store` with the given limits.
    pub fn new(store: Arc<dyn Store>, limits: Limits) -> Self {
        Self { store, limits }
    }

    /// Return the user's invite code, assigning one on first use.
    ///
    /// Creates the account when it is missing, so sharing an invite link is
    /// always possible even before the first paraphrase.
    pub fn ensure_invite_code(&self, user_id: &UserId) -> Result<String> {
        let account = self
            .store
            .create_account_if_absent(&UserAccount::new(user_id.clone()))?;
        if let Some(code) = account.invite_code {
            return Ok(code);
        }

        let code = make_invite_code(user_id);
        self.store.set_invite_code(user_id, &code)?;
        tracing::info!(user_id = %user_id, "Assigned invite code");
        Ok(code)
    }

    /// Apply an invite code carried by a brand-new user's first contact.
    ///
    /// Credits the inviter and records the referral atomically. A code that
    /// does not resolve, a self-referral, or a user who already has an
    /// account all degrade to an uncredited outcome instead of failing the
    /// onboarding flow.
    pub fn apply_referral(
        &self,
        new_account: &UserAccount,
        invite_code: &str,
    ) -> Result<ReferralOutcome> {
        let Some(inviter_id) = self.store.find_user_by_invite_code(invite_code)? else {
            tracing::info!(invite_code, "Invite code did not resolve to an inviter");
            return Ok(ReferralOutcome::not_credited());
        };

        let mut account = new_account.clone();
        account.inviter_id = Some(inviter_id.clone());
        let record = ReferralRecord::new(inviter_id.clone(), account.user_id.clone());

        match self
            .store
            .create_referred_account(&account, &record, self.limits.referral_bonus)
        {
            Ok(()) => {
                tracing::info!(
                    inviter_id = %inviter_id,
                    new_user_id = %account.user_id,
                    "Referral credited"
                );
                Ok(ReferralOutcome {
                    credited: true,
                    inviter_id: Some(inviter_id),
                })
            }
            Err(StoreError::AlreadyReferred { user_id }) => {
                tracing::info!(user_id = %user_id, "User already referred, not crediting again");
                Ok(ReferralOutcome::not_credited())
            }
            Err(StoreError::SelfReferral { user_id }) => {
                tracing::info!(user_id = %user_id, "Self-referral rejected");
                Ok(ReferralOutcome::not_credited())
            }
            Err(e) => Err(e),
        }
    }

    /// Acknowledge pending referrals and convert them into daily allowance.
    ///
    /// Returns the number of newly acknowledged referrals; each one lowers
    /// today's usage counter by the configured bonus.
    pub fn acknowledge_and_credit(&self, inviter_id: &UserId) -> Result<u32> {
        let pending = self.store.unacknowledged_referrals(inviter_id)?;
        if pending.is_empty() {
            return Ok(0);
        }

        let ids: Vec<_> = pending.iter().map(|r| r.id).collect();
        self.store.acknowledge_referrals(&ids, Utc::now())?;

        let count = u32::try_from(pending.len()).unwrap_or(u32::MAX);
        let earned = count.saturating_mul(self.limits.referral_bonus);
        self.store
            .reduce_today_usage(inviter_id, earned, Utc::now().date_naive())?;

        tracing::info!(inviter_id = %inviter_id, count, earned, "Referrals acknowledged");
        Ok(count)
    }
}
