//! Event system for job progress
//!
//! The poller and the dispatcher report every state transition through an
//! [`EventBus`]. Front ends subscribe and render events however they like; the
//! library itself never prints.
//!
//! The bus uses `tokio::sync::broadcast`. If no subscribers exist, events are
//! dropped immediately. Subscribers can lag without blocking emitters.
//!
//! # Example
//!
//! ```
//! use libxbot::service::events::{Event, EventBus};
//!
//! # async fn example() {
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus.emit(Event::NoResults);
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("{}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Event receiver type alias
pub type EventReceiver = broadcast::Receiver<Event>;

/// Event bus for distributing job events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given per-subscriber buffer
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers (non-blocking)
    pub fn emit(&self, event: Event) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

/// The automated action a poller performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Like,
    Retweet,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Like => write!(f, "like"),
            ActionKind::Retweet => write!(f, "retweet"),
        }
    }
}

/// Events emitted by the poller and the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Poller entered its loop
    PollingStarted {
        action: ActionKind,
        query: String,
        cooldown_secs: u64,
    },

    /// A gated search returned results
    SearchCompleted { results: usize },

    /// A gated search returned nothing
    NoResults,

    /// One like or retweet went through
    ActionPerformed {
        action: ActionKind,
        tweet_id: String,
        author_id: Option<String>,
        excerpt: String,
    },

    /// A candidate could not be acted on; the next one is tried
    ItemSkipped {
        action: ActionKind,
        tweet_id: String,
        reason: String,
    },

    /// Every candidate in a batch failed
    NoEligibleResults { candidates: usize },

    /// The API reported a rate limit; waiting before the next attempt
    RateLimited { backoff_secs: u64 },

    /// A search failed for an unclassified reason
    SearchFailed { error: String, retry_in_secs: u64 },

    /// The daily action cap is reached; the attempt was skipped
    DailyLimitReached { limit: u32 },

    /// Authorization failed; the job stops
    Terminal { error: String },

    /// The job was cancelled while waiting
    Stopped,

    /// Dispatcher entered its loop
    ScheduleStarted { total: usize, interval_secs: u64 },

    /// A queued payload was posted
    PostSubmitted {
        position: usize,
        total: usize,
        tweet_id: String,
    },

    /// A queued payload failed; it is retried at the next fire
    PostFailed { position: usize, error: String },

    /// The queue is exhausted
    ScheduleCompleted { sent: usize },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::PollingStarted {
                action,
                query,
                cooldown_secs,
            } => write!(
                f,
                "Monitoring `{}`; will {} at most one post every {}",
                query,
                action,
                humantime::format_duration(std::time::Duration::from_secs(*cooldown_secs))
            ),
            Event::SearchCompleted { results } => write!(f, "Search returned {} post(s)", results),
            Event::NoResults => write!(f, "No tweets found matching the query"),
            Event::ActionPerformed {
                action: ActionKind::Like,
                excerpt,
                ..
            } => write!(f, "Liked tweet: {}", excerpt),
            Event::ActionPerformed {
                action: ActionKind::Retweet,
                author_id,
                excerpt,
                ..
            } => write!(
                f,
                "Retweeted from {}: {}",
                author_id.as_deref().unwrap_or("unknown"),
                excerpt
            ),
            Event::ItemSkipped {
                action,
                tweet_id,
                reason,
            } => write!(f, "Cannot {} tweet {}: {}", action, tweet_id, reason),
            Event::NoEligibleResults { candidates } => {
                write!(f, "None of {} candidate(s) could be acted on", candidates)
            }
            Event::RateLimited { backoff_secs } => {
                write!(f, "Rate limit reached. Waiting {} seconds...", backoff_secs)
            }
            Event::SearchFailed {
                error,
                retry_in_secs,
            } => write!(
                f,
                "Error searching tweets: {} (retrying in {}s)",
                error, retry_in_secs
            ),
            Event::DailyLimitReached { limit } => {
                write!(f, "Daily limit of {} action(s) reached; skipping", limit)
            }
            Event::Terminal { error } => write!(f, "Stopping: {}", error),
            Event::Stopped => write!(f, "Stopped by user"),
            Event::ScheduleStarted {
                total,
                interval_secs,
            } => write!(
                f,
                "Scheduled {} tweets to be posted every {}",
                total,
                humantime::format_duration(std::time::Duration::from_secs(*interval_secs))
            ),
            Event::PostSubmitted {
                position,
                total,
                tweet_id,
            } => write!(f, "Posted scheduled tweet {}/{} (ID: {})", position, total, tweet_id),
            Event::PostFailed { position, error } => write!(
                f,
                "Scheduled tweet {} failed, will retry: {}",
                position, error
            ),
            Event::ScheduleCompleted { sent } => {
                write!(f, "All scheduled tweets have been posted ({} sent)", sent)
            }
        }
    }
}
