//! Gemini generation client for the reword paraphrase-bot backend.
//!
//! [`GeminiClient`] wraps the `generateContent` endpoint of the Google
//! generative-language API with:
//!
//! - an ordered pool of API keys with mutex-guarded rotation,
//! - a small semaphore bounding concurrent provider calls,
//! - bounded retry with key rotation between attempts,
//! - deterministic fallback output, so `generate` always returns exactly
//!   the requested number of strings and never surfaces provider failures
//!   to the user-facing flow.
//!
//! Response decomposition is delegated to `reword_core::split`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod prompt;

pub use client::{GeminiClient, GeminiError, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use prompt::build_prompt;
