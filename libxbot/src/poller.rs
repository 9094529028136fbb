//! Rate-gated polling loop
//!
//! Drives auto-like and auto-retweet. Every tick the poller checks the
//! [`CooldownGate`]; when it is open (and the daily limiter has capacity) it
//! runs one search-then-act cycle:
//!
//! - search once; act on the first candidate that accepts the action, then stop
//! - `Unauthorized` anywhere stops the loop
//! - `RateLimited` anywhere sleeps the long backoff without re-arming the gate
//! - a per-item failure skips to the next candidate in the same batch
//! - any other search failure sleeps the short error backoff
//!
//! A completed search re-arms the gate whether or not an action followed. An
//! empty result set re-arms it after the empty-results backoff. Cancellation is
//! observed only while sleeping.

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::PollingConfig;
use crate::error::{FailureKind, Result, SocialError, XbotError};
use crate::rate_limiter::{CooldownGate, SharedLimiter};
use crate::service::events::{ActionKind, Event, EventBus};
use crate::shutdown::ShutdownSignal;
use crate::social::{self, SocialClient, Tweet};

/// What the poller searches for and what it does with a hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollMode {
    /// Like the first post matching any keyword
    LikeKeywords(Vec<String>),
    /// Retweet the first post from any trusted account
    RetweetTrusted(Vec<String>),
}

impl PollMode {
    pub fn action(&self) -> ActionKind {
        match self {
            PollMode::LikeKeywords(_) => ActionKind::Like,
            PollMode::RetweetTrusted(_) => ActionKind::Retweet,
        }
    }

    pub fn query(&self) -> String {
        match self {
            PollMode::LikeKeywords(keywords) => social::keyword_query(keywords),
            PollMode::RetweetTrusted(accounts) => social::from_accounts_query(accounts),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            PollMode::LikeKeywords(keywords) if keywords.is_empty() => Err(
                XbotError::InvalidInput("No valid keywords provided".to_string()),
            ),
            PollMode::RetweetTrusted(accounts) if accounts.is_empty() => {
                Err(XbotError::InvalidInput(
                    "No trusted sources configured. Please add some first.".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// How a polling run ended
#[derive(Debug)]
pub enum PollOutcome {
    /// Shutdown was requested while waiting
    Cancelled,
    /// An authorization failure stopped the loop
    Terminal(SocialError),
}

enum Cycle {
    /// Re-arm the gate
    Done,
    /// Leave the gate as it was
    Retry,
    Cancelled,
    Terminal(SocialError),
}

pub struct RateGatedPoller {
    client: Arc<dyn SocialClient>,
    settings: PollingConfig,
    gate: CooldownGate,
    limiter: SharedLimiter,
    events: EventBus,
}

impl RateGatedPoller {
    pub fn new(
        client: Arc<dyn SocialClient>,
        settings: PollingConfig,
        limiter: SharedLimiter,
        events: EventBus,
    ) -> Self {
        let gate = CooldownGate::new(settings.cooldown);
        Self {
            client,
            settings,
            gate,
            limiter,
            events,
        }
    }

    pub fn gate(&self) -> &CooldownGate {
        &self.gate
    }

    /// Poll until cancelled or stopped by an authorization failure
    ///
    /// Fails fast with [`XbotError::InvalidInput`] when the mode carries no
    /// keywords or accounts.
    pub async fn run(&mut self, mode: &PollMode, signal: &ShutdownSignal) -> Result<PollOutcome> {
        mode.validate()?;

        let action = mode.action();
        let query = mode.query();
        info!("Starting auto-{} for query: {}", action, query);
        self.events.emit(Event::PollingStarted {
            action,
            query: query.clone(),
            cooldown_secs: self.settings.cooldown.as_secs(),
        });

        let mut limit_reported = false;
        loop {
            let now = Instant::now();
            if self.gate.is_open(now) {
                let has_capacity = self.limiter.lock().unwrap().has_capacity(now);
                if has_capacity {
                    limit_reported = false;
                    match self.cycle(&query, action, signal).await {
                        Cycle::Done => self.gate.mark(Instant::now()),
                        Cycle::Retry => {}
                        Cycle::Cancelled => return Ok(self.stopped(action)),
                        Cycle::Terminal(e) => {
                            error!("Auto-{} stopped: {}", action, e);
                            self.events.emit(Event::Terminal {
                                error: e.to_string(),
                            });
                            return Ok(PollOutcome::Terminal(e));
                        }
                    }
                } else if !limit_reported {
                    let limit = self.limiter.lock().unwrap().limit();
                    warn!("Daily action limit of {} reached, skipping cycle", limit);
                    self.events.emit(Event::DailyLimitReached { limit });
                    limit_reported = true;
                }
            } else {
                debug!(
                    "Cooldown active, {}s until next attempt",
                    self.gate.remaining(now).as_secs()
                );
            }

            if signal.sleep(self.settings.tick_interval).await {
                return Ok(self.stopped(action));
            }
        }
    }

    async fn cycle(&self, query: &str, action: ActionKind, signal: &ShutdownSignal) -> Cycle {
        let tweets = match self.client.search(query, self.settings.max_results).await {
            Ok(tweets) => tweets,
            Err(e) => return self.search_failed(e, signal).await,
        };

        if tweets.is_empty() {
            info!("No tweets found matching the query");
            self.events.emit(Event::NoResults);
            if signal.sleep(self.settings.empty_backoff).await {
                return Cycle::Cancelled;
            }
            return Cycle::Done;
        }

        debug!("Search returned {} tweet(s)", tweets.len());
        self.events.emit(Event::SearchCompleted {
            results: tweets.len(),
        });

        for tweet in &tweets {
            match self.act(action, tweet).await {
                Ok(()) => {
                    self.limiter.lock().unwrap().record(Instant::now());
                    info!(
                        "Auto-{} succeeded for tweet {}: {}",
                        action,
                        tweet.id,
                        tweet.excerpt()
                    );
                    self.events.emit(Event::ActionPerformed {
                        action,
                        tweet_id: tweet.id.clone(),
                        author_id: tweet.author_id.clone(),
                        excerpt: tweet.excerpt(),
                    });
                    return Cycle::Done;
                }
                Err(e) => match e.kind() {
                    FailureKind::Terminal => return Cycle::Terminal(e),
                    FailureKind::RateLimit => return self.rate_limited(signal).await,
                    FailureKind::Transient => {
                        warn!("Cannot {} tweet {}: {}", action, tweet.id, e);
                        self.events.emit(Event::ItemSkipped {
                            action,
                            tweet_id: tweet.id.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        warn!("No candidate out of {} accepted the {}", tweets.len(), action);
        self.events.emit(Event::NoEligibleResults {
            candidates: tweets.len(),
        });
        Cycle::Done
    }

    async fn act(&self, action: ActionKind, tweet: &Tweet) -> social::SocialResult<()> {
        match action {
            ActionKind::Like => self.client.like(&tweet.id).await,
            ActionKind::Retweet => self.client.retweet(&tweet.id).await,
        }
    }

    async fn search_failed(&self, e: SocialError, signal: &ShutdownSignal) -> Cycle {
        match e.kind() {
            FailureKind::Terminal => Cycle::Terminal(e),
            FailureKind::RateLimit => self.rate_limited(signal).await,
            FailureKind::Transient => {
                let backoff = self.settings.error_backoff;
                error!("Error searching tweets: {}", e);
                self.events.emit(Event::SearchFailed {
                    error: e.to_string(),
                    retry_in_secs: backoff.as_secs(),
                });
                if signal.sleep(backoff).await {
                    Cycle::Cancelled
                } else {
                    Cycle::Retry
                }
            }
        }
    }

    async fn rate_limited(&self, signal: &ShutdownSignal) -> Cycle {
        let backoff = self.settings.rate_limit_backoff;
        warn!("Rate limit reached, waiting {}s", backoff.as_secs());
        self.events.emit(Event::RateLimited {
            backoff_secs: backoff.as_secs(),
        });
        if signal.sleep(backoff).await {
            Cycle::Cancelled
        } else {
            Cycle::Retry
        }
    }

    fn stopped(&self, action: ActionKind) -> PollOutcome {
        info!("Stopped auto-{}", action);
        self.events.emit(Event::Stopped);
        PollOutcome::Cancelled
    }
}
