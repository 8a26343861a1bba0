//! Service layer for the reword paraphrase bot.
//!
//! This crate ties the storage and generation layers together:
//!
//! - [`QuotaLedger`] - allowance checks and atomic usage commits
//! - [`ReferralEngine`] - invite codes, referral crediting, acknowledgment
//! - [`RequestOrchestrator`] - the conversation flows (paraphrase request,
//!   add-more, try-again, start), emitting transport-neutral [`Reply`]
//!   payloads through the [`ReplyChannel`] seam
//! - a small axum surface (`/health`, `/v1/stats`) for liveness and
//!   aggregate reporting
//! - a background sweep clearing expired verification-prompt tracking
//!
//! The transport adapter (the actual chat-platform glue) lives outside this
//! crate; it implements [`ReplyChannel`] and calls the orchestrator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Axum handlers all return Result; documenting each error variant adds noise.
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod orchestrator;
pub mod referral;
pub mod routes;
pub mod state;
pub mod sweep;

pub use config::{ConfigError, ServiceConfig};
pub use error::ApiError;
pub use ledger::QuotaLedger;
pub use orchestrator::{
    ChannelError, OrchestratorError, Reply, ReplyChannel, RequestOrchestrator, SentMessage,
    ALLOWED_COUNTS,
};
pub use referral::{ReferralEngine, ReferralOutcome};
pub use routes::create_router;
pub use state::AppState;
