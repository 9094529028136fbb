//! Service layer for xbot
//!
//! [`BotService`] is the single entry point front ends use. It owns the social
//! and LLM facades, the trusted-source store, the shared daily limiter and the
//! event bus, and exposes every bot operation as a plain method call so the
//! loops can be driven without a terminal.
//!
//! # Example
//!
//! ```no_run
//! use libxbot::service::BotService;
//! use libxbot::{Config, Credentials, Shutdown};
//!
//! # async fn example() -> libxbot::Result<()> {
//! let service = BotService::connect(Config::load()?, Credentials::from_env()?).await?;
//!
//! let shutdown = Shutdown::new();
//! let outcome = service
//!     .auto_like(vec!["rust".to_string()], &shutdown.signal())
//!     .await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod events;

use secrecy::SecretString;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use self::events::{EventBus, EventReceiver};
use crate::config::{expand_path, Config};
use crate::credentials::Credentials;
use crate::error::{Result, XbotError};
use crate::llm::openai::OpenAiClient;
use crate::llm::{LlmGate, TextGenerator};
use crate::poller::{PollMode, PollOutcome, RateGatedPoller};
use crate::rate_limiter::{DailyLimiter, SharedLimiter};
use crate::scheduling::{self, DispatchOutcome, ScheduledPostDispatcher, TweetQueue};
use crate::shutdown::ShutdownSignal;
use crate::social::x::XClient;
use crate::social::{self, Account, PostedTweet, SocialClient};
use crate::trusted::TrustedSourceStore;

/// Main service facade
pub struct BotService {
    config: Arc<Config>,
    client: Arc<dyn SocialClient>,
    llm: LlmGate,
    trusted: Mutex<TrustedSourceStore>,
    poller: tokio::sync::Mutex<RateGatedPoller>,
    dispatcher: ScheduledPostDispatcher,
    limiter: SharedLimiter,
    event_bus: EventBus,
    account: Option<Account>,
}

impl BotService {
    /// Build the real X and LLM clients and verify the X credentials
    ///
    /// # Errors
    ///
    /// Returns an error if a client cannot be built, the credentials are
    /// rejected, or the trusted-source file cannot be read or created.
    pub async fn connect(config: Config, credentials: Credentials) -> Result<Self> {
        let client = XClient::new(&config.x.api_base, credentials.x)?;
        let generator = OpenAiClient::new(
            &config.llm.endpoint,
            &config.llm.model,
            credentials.llm.api_key,
        )?;

        let mut service = Self::with_clients(
            config,
            Arc::new(client),
            Arc::new(generator),
            credentials.llm.secret_word,
        )?;

        let account = service.verify().await?;
        tracing::info!("Authentication successful for user @{}", account.username);
        service.account = Some(account);
        Ok(service)
    }

    /// Build a service around existing facades
    ///
    /// Used by tests and by callers that bring their own clients.
    pub fn with_clients(
        config: Config,
        client: Arc<dyn SocialClient>,
        generator: Arc<dyn TextGenerator>,
        secret_word: SecretString,
    ) -> Result<Self> {
        let trusted = TrustedSourceStore::load(expand_path(&config.trusted_sources.path))?;
        let limiter = DailyLimiter::new(
            config.limits.daily_actions,
            config.limits.reset_interval,
            Instant::now(),
        )
        .into_shared();
        let event_bus = EventBus::new(100);

        let llm = LlmGate::new(generator, secret_word, config.llm.clone());
        let poller = RateGatedPoller::new(
            Arc::clone(&client),
            config.polling.clone(),
            Arc::clone(&limiter),
            event_bus.clone(),
        );
        let dispatcher = ScheduledPostDispatcher::new(
            Arc::clone(&client),
            config.schedule.interval,
            Arc::clone(&limiter),
            event_bus.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            client,
            llm,
            trusted: Mutex::new(trusted),
            poller: tokio::sync::Mutex::new(poller),
            dispatcher,
            limiter,
            event_bus,
            account: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The account verified by [`BotService::connect`]
    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Subscribe to job events
    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    /// Actions recorded against the daily limit in the current window
    pub fn actions_today(&self) -> u32 {
        self.limiter.lock().unwrap().count()
    }

    /// Resolve the account behind the configured credentials
    pub async fn verify(&self) -> Result<Account> {
        match self.client.verify_credentials().await {
            Ok(account) => Ok(account),
            Err(e) => {
                tracing::error!("Authentication failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Post `text` right away
    pub async fn post(&self, text: &str) -> Result<PostedTweet> {
        let text = text.trim();
        if text.is_empty() {
            return Err(XbotError::InvalidInput(
                "Tweet content cannot be empty.".to_string(),
            ));
        }

        match self.client.post(text).await {
            Ok(posted) => {
                tracing::info!("Manual Tweeted (ID: {}): {}", posted.id, text);
                Ok(posted)
            }
            Err(e) => {
                tracing::error!("Error sending manual tweet: {}", e);
                Err(e.into())
            }
        }
    }

    /// Load payloads from `path`, or from the configured CSV when `None`
    pub fn load_schedule(&self, path: Option<&Path>) -> Result<Vec<String>> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => expand_path(&self.config.schedule.csv_path),
        };
        scheduling::load_tweets_from_csv(&path).map_err(|e| {
            tracing::error!("Could not load scheduled tweets from {}: {}", path.display(), e);
            e
        })
    }

    /// Post `items` one per schedule interval
    pub async fn run_schedule(&self, items: Vec<String>, signal: &ShutdownSignal) -> DispatchOutcome {
        let mut queue = TweetQueue::new(items);
        self.dispatcher.run(&mut queue, signal).await
    }

    /// Like one post matching `keywords` per cooldown window
    pub async fn auto_like(&self, keywords: Vec<String>, signal: &ShutdownSignal) -> Result<PollOutcome> {
        let mode = PollMode::LikeKeywords(keywords);
        self.poller.lock().await.run(&mode, signal).await
    }

    /// Retweet one post from the trusted sources per cooldown window
    pub async fn auto_retweet(&self, signal: &ShutdownSignal) -> Result<PollOutcome> {
        let mode = PollMode::RetweetTrusted(self.sources());
        self.poller.lock().await.run(&mode, signal).await
    }

    /// Summarize recent posts about `keywords`
    ///
    /// Returns `None` when the search finds nothing.
    pub async fn summarize(&self, keywords: &[String]) -> Result<Option<String>> {
        if keywords.is_empty() {
            return Err(XbotError::InvalidInput(
                "No valid keywords provided".to_string(),
            ));
        }

        let query = social::keyword_query(keywords);
        let tweets = self
            .client
            .search(&query, self.config.polling.max_results)
            .await?;
        if tweets.is_empty() {
            tracing::info!("No tweets found for summary query: {}", query);
            return Ok(None);
        }

        let texts: Vec<String> = tweets.into_iter().map(|t| t.text).collect();
        Ok(Some(self.llm.summarize(keywords, &texts).await))
    }

    /// Answer a message through the gated LLM
    pub async fn respond(&self, message: &str) -> String {
        self.llm.respond(message).await
    }

    /// Draft a post through the gated LLM
    pub async fn generate_post(&self, prompt: &str) -> String {
        self.llm.generate_post(prompt).await
    }

    /// Trusted sources in insertion order
    pub fn sources(&self) -> Vec<String> {
        self.trusted.lock().unwrap().sources().to_vec()
    }

    pub fn add_source(&self, handle: &str) -> Result<bool> {
        self.trusted.lock().unwrap().add(handle)
    }

    /// Remove the source at 1-based `position`
    pub fn remove_source(&self, position: usize) -> Result<Option<String>> {
        self.trusted.lock().unwrap().remove(position)
    }
}
