//! Core types and logic for the reword paraphrase-bot backend.
//!
//! This crate provides the foundational types used throughout the platform:
//!
//! - **Identifiers**: `UserId`, `ReferralId`, `EventId`, `TrackingId`
//! - **Accounts**: `UserAccount`, `Limits`, `Allowance`
//! - **Referrals**: `ReferralRecord`, invite-code generation
//! - **Events**: `ParaphraseEvent`, `VerificationMessage`, `Session`
//! - **Splitting**: deterministic decomposition of a raw model response
//!   into discrete paraphrase strings
//!
//! # Counters
//!
//! Usage is counted in whole paraphrases. An account carries a lifetime
//! counter and a per-calendar-day counter that resets lazily on the first
//! commit of a new day; there is no scheduled reset job.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod event;
pub mod ids;
pub mod referral;
pub mod split;

pub use account::{
    Allowance, Limits, UserAccount, DEFAULT_DAILY_LIMIT, DEFAULT_REFERRAL_BONUS,
    DEFAULT_VERIFICATION_THRESHOLD,
};
pub use event::{AdminRecord, ParaphraseEvent, Session, VerificationMessage};
pub use ids::{EventId, IdError, ReferralId, TrackingId, UserId};
pub use referral::{make_invite_code, ReferralRecord};
pub use split::{fallback_paraphrase, split, PARAPHRASE_SEPARATOR};
