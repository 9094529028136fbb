//! xbot - terminal assistant for X
//!
//! This library provides the core of the bot: manual and scheduled posting,
//! rate-gated auto-like and auto-retweet loops, a trusted-source store, and a
//! shared-secret gate in front of a language model. Front ends drive it
//! through [`service::BotService`].

pub mod config;
pub mod credentials;
pub mod error;
pub mod llm;
pub mod logging;
pub mod poller;
pub mod rate_limiter;
pub mod scheduling;
pub mod service;
pub mod shutdown;
pub mod social;
pub mod trusted;

// Re-export commonly used types
pub use config::Config;
pub use credentials::Credentials;
pub use error::{FailureKind, Result, XbotError};
pub use poller::{PollMode, PollOutcome};
pub use scheduling::DispatchOutcome;
pub use shutdown::{Shutdown, ShutdownSignal};
pub use social::{PostedTweet, Tweet};
pub use trusted::TrustedSourceStore;
