//! Scheduled posting from a prepared list
//!
//! [`load_tweets_from_csv`] turns a CSV sheet into ready-to-send payloads.
//! [`ScheduledPostDispatcher`] submits one payload per interval, advancing the
//! [`TweetQueue`] cursor only when the post is confirmed. A failed submission
//! keeps its slot and is retried at the next fire.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::{FailureKind, Result, SocialError, StorageError};
use crate::rate_limiter::SharedLimiter;
use crate::service::events::{Event, EventBus};
use crate::shutdown::ShutdownSignal;
use crate::social::{PostedTweet, SocialClient};

const TEXT_COLUMN: &str = "Tweet Text";
const HASHTAG_COLUMNS: [&str; 4] = ["Hashtag1", "Hashtag2", "Hashtag3", "Hashtag4"];

/// Read payloads from a CSV file with a `Tweet Text` column
///
/// Each row becomes the text followed by its non-empty `Hashtag1..4` values,
/// separated by single spaces. Rows that end up blank are skipped.
pub fn load_tweets_from_csv(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(StorageError::Csv)?;

    let headers = reader.headers().map_err(StorageError::Csv)?.clone();
    let text_index = headers
        .iter()
        .position(|h| h.trim() == TEXT_COLUMN)
        .ok_or_else(|| StorageError::MissingColumn(TEXT_COLUMN.to_string()))?;
    let hashtag_indices: Vec<usize> = HASHTAG_COLUMNS
        .iter()
        .filter_map(|name| headers.iter().position(|h| h.trim() == *name))
        .collect();

    let mut tweets = Vec::new();
    for record in reader.records() {
        let record = record.map_err(StorageError::Csv)?;

        let mut parts: Vec<&str> = Vec::with_capacity(1 + hashtag_indices.len());
        let text = record.get(text_index).unwrap_or("").trim();
        if !text.is_empty() {
            parts.push(text);
        }
        parts.extend(
            hashtag_indices
                .iter()
                .filter_map(|&i| record.get(i))
                .map(str::trim)
                .filter(|tag| !tag.is_empty()),
        );

        if parts.is_empty() {
            continue;
        }
        tweets.push(parts.join(" "));
    }

    info!("Loaded {} tweets from {}", tweets.len(), path.display());
    Ok(tweets)
}

/// Payloads plus the index of the next unsent one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetQueue {
    items: Vec<String>,
    cursor: usize,
}

impl TweetQueue {
    pub fn new(items: Vec<String>) -> Self {
        Self { items, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of payloads confirmed as sent
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.items.len()
    }

    /// The payload at the cursor
    pub fn peek(&self) -> Option<&str> {
        self.items.get(self.cursor).map(String::as_str)
    }

    /// Payloads not yet sent
    pub fn remaining(&self) -> &[String] {
        &self.items[self.cursor.min(self.items.len())..]
    }

    fn advance(&mut self) {
        if self.cursor < self.items.len() {
            self.cursor += 1;
        }
    }
}

/// Result of one scheduled fire
#[derive(Debug)]
pub enum FireResult {
    Sent(PostedTweet),
    Failed(SocialError),
    /// Daily limit reached; nothing was submitted
    Skipped,
    /// The queue was already exhausted
    Idle,
}

/// How a dispatcher run ended
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The input was empty; nothing was scheduled
    NothingToSend,
    /// Every payload was posted
    Completed { sent: usize },
    /// Shutdown was requested; unsent payloads are dropped
    Cancelled { sent: usize, unsent: usize },
    /// An authorization failure stopped the run
    Terminal(SocialError),
}

pub struct ScheduledPostDispatcher {
    client: Arc<dyn SocialClient>,
    interval: Duration,
    limiter: SharedLimiter,
    events: EventBus,
}

impl ScheduledPostDispatcher {
    pub fn new(
        client: Arc<dyn SocialClient>,
        interval: Duration,
        limiter: SharedLimiter,
        events: EventBus,
    ) -> Self {
        Self {
            client,
            interval,
            limiter,
            events,
        }
    }

    /// Fire every interval until the queue is exhausted
    ///
    /// The first fire happens one interval after the call.
    pub async fn run(&self, queue: &mut TweetQueue, signal: &ShutdownSignal) -> DispatchOutcome {
        if queue.is_empty() {
            info!("No tweets to schedule");
            return DispatchOutcome::NothingToSend;
        }

        info!(
            "Scheduled {} tweets to be posted every {}",
            queue.len(),
            humantime::format_duration(self.interval)
        );
        self.events.emit(Event::ScheduleStarted {
            total: queue.len(),
            interval_secs: self.interval.as_secs(),
        });

        while !queue.is_exhausted() {
            if signal.sleep(self.interval).await {
                let unsent = queue.remaining().len();
                info!("Scheduler stopped by user ({} unsent)", unsent);
                self.events.emit(Event::Stopped);
                return DispatchOutcome::Cancelled {
                    sent: queue.cursor(),
                    unsent,
                };
            }

            if let FireResult::Failed(e) = self.fire(queue).await {
                if e.kind() == FailureKind::Terminal {
                    error!("Scheduler stopped: {}", e);
                    self.events.emit(Event::Terminal {
                        error: e.to_string(),
                    });
                    return DispatchOutcome::Terminal(e);
                }
            }
        }

        info!("All scheduled tweets have been posted");
        self.events.emit(Event::ScheduleCompleted {
            sent: queue.cursor(),
        });
        DispatchOutcome::Completed {
            sent: queue.cursor(),
        }
    }

    /// Submit the payload at the cursor once
    pub async fn fire(&self, queue: &mut TweetQueue) -> FireResult {
        let Some(text) = queue.peek().map(str::to_string) else {
            return FireResult::Idle;
        };
        let position = queue.cursor() + 1;

        let has_capacity = self.limiter.lock().unwrap().has_capacity(Instant::now());
        if !has_capacity {
            let limit = self.limiter.lock().unwrap().limit();
            warn!("Daily action limit of {} reached, holding scheduled tweet {}", limit, position);
            self.events.emit(Event::DailyLimitReached { limit });
            return FireResult::Skipped;
        }

        match self.client.post(&text).await {
            Ok(posted) => {
                self.limiter.lock().unwrap().record(Instant::now());
                queue.advance();
                info!("Scheduled tweet posted (ID: {}): {}", posted.id, text);
                self.events.emit(Event::PostSubmitted {
                    position,
                    total: queue.len(),
                    tweet_id: posted.id.clone(),
                });
                FireResult::Sent(posted)
            }
            Err(e) => {
                error!("Error posting scheduled tweet {}: {}", position, e);
                self.events.emit(Event::PostFailed {
                    position,
                    error: e.to_string(),
                });
                FireResult::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limiter::DailyLimiter;
    use crate::shutdown::Shutdown;
    use crate::social::mock::MockSocialClient;
    use std::fs;
    use tempfile::TempDir;

    const TWO_HOURS: Duration = Duration::from_secs(2 * 3600);

    fn dispatcher(client: &MockSocialClient, daily: u32) -> ScheduledPostDispatcher {
        let limiter =
            DailyLimiter::new(daily, Duration::from_secs(24 * 3600), Instant::now()).into_shared();
        ScheduledPostDispatcher::new(
            Arc::new(client.clone()),
            TWO_HOURS,
            limiter,
            EventBus::new(64),
        )
    }

    fn queue(n: usize) -> TweetQueue {
        TweetQueue::new((1..=n).map(|i| format!("tweet {}", i)).collect())
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_slot() {
        let client = MockSocialClient::new();
        client.queue_post(Err(SocialError::Api("503".to_string())));
        let dispatcher = dispatcher(&client, 17);
        let mut queue = queue(3);

        assert!(matches!(dispatcher.fire(&mut queue).await, FireResult::Failed(_)));
        assert_eq!(queue.cursor(), 0);

        assert!(matches!(dispatcher.fire(&mut queue).await, FireResult::Sent(_)));
        assert_eq!(queue.cursor(), 1);
        assert_eq!(client.posted(), vec!["tweet 1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_then_completes() {
        let client = MockSocialClient::new();
        client.queue_post(Err(SocialError::Api("503".to_string())));
        let dispatcher = dispatcher(&client, 17);
        let mut queue = queue(3);
        let start = Instant::now();

        let outcome = dispatcher.run(&mut queue, &ShutdownSignal::never()).await;

        assert!(matches!(outcome, DispatchOutcome::Completed { sent: 3 }));
        assert_eq!(
            client.posted(),
            vec!["tweet 1".to_string(), "tweet 2".to_string(), "tweet 3".to_string()]
        );
        // one failed fire plus three successful ones
        assert_eq!(start.elapsed().as_secs(), 4 * TWO_HOURS.as_secs());
        assert_eq!(client.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_moves_only_after_success() {
        let client = MockSocialClient::new();
        client.queue_post(Err(SocialError::Network("reset".to_string())));
        let dispatcher = dispatcher(&client, 17);
        let shutdown = Shutdown::new();
        let signal = shutdown.signal();

        let stopper = tokio::spawn(async move {
            // just past the second fire
            tokio::time::sleep(TWO_HOURS * 2 + Duration::from_secs(60)).await;
            shutdown.trigger();
        });

        let mut queue = queue(3);
        let outcome = dispatcher.run(&mut queue, &signal).await;
        stopper.await.unwrap();

        assert!(matches!(
            outcome,
            DispatchOutcome::Cancelled { sent: 1, unsent: 2 }
        ));
        assert_eq!(queue.cursor(), 1);
        assert_eq!(queue.remaining(), &["tweet 2".to_string(), "tweet 3".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_fire() {
        let client = MockSocialClient::new();
        let dispatcher = dispatcher(&client, 17);
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let mut queue = queue(2);
        let outcome = dispatcher.run(&mut queue, &shutdown.signal()).await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Cancelled { sent: 0, unsent: 2 }
        ));
        assert!(client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_stops_dispatcher() {
        let client = MockSocialClient::new();
        client.queue_post(Err(SocialError::Unauthorized("revoked".to_string())));
        let dispatcher = dispatcher(&client, 17);
        let mut queue = queue(2);

        let outcome = dispatcher.run(&mut queue, &ShutdownSignal::never()).await;

        assert!(matches!(outcome, DispatchOutcome::Terminal(_)));
        assert_eq!(queue.cursor(), 0);
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_is_noop() {
        let client = MockSocialClient::new();
        let dispatcher = dispatcher(&client, 17);

        let outcome = dispatcher
            .run(&mut TweetQueue::new(Vec::new()), &ShutdownSignal::never())
            .await;

        assert!(matches!(outcome, DispatchOutcome::NothingToSend));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_daily_limit_holds_slot() {
        let client = MockSocialClient::new();
        let dispatcher = dispatcher(&client, 1);
        let mut queue = queue(2);

        assert!(matches!(dispatcher.fire(&mut queue).await, FireResult::Sent(_)));
        assert!(matches!(dispatcher.fire(&mut queue).await, FireResult::Skipped));
        assert_eq!(queue.cursor(), 1);
        assert_eq!(client.calls().len(), 1);
    }

    #[test]
    fn test_queue_cursor_never_exceeds_len() {
        let mut queue = queue(1);
        queue.advance();
        queue.advance();

        assert_eq!(queue.cursor(), 1);
        assert!(queue.is_exhausted());
        assert!(queue.peek().is_none());
        assert!(queue.remaining().is_empty());
    }

    #[test]
    fn test_load_tweets_from_csv() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tweets.csv");
        fs::write(
            &path,
            "Tweet Text,Hashtag1,Hashtag2,Hashtag3,Hashtag4\n\
             Hello world,#rust,,#tokio,\n\
             \"Quoted, with comma\",,,,\n\
             ,,,,\n\
             Only tags? ,#a,#b,#c,#d\n",
        )
        .unwrap();

        let tweets = load_tweets_from_csv(&path).unwrap();

        assert_eq!(
            tweets,
            vec![
                "Hello world #rust #tokio".to_string(),
                "Quoted, with comma".to_string(),
                "Only tags? #a #b #c #d".to_string(),
            ]
        );
    }

    #[test]
    fn test_hashtag_columns_are_optional() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tweets.csv");
        fs::write(&path, "Tweet Text\nfirst\nsecond\n").unwrap();

        let tweets = load_tweets_from_csv(&path).unwrap();

        assert_eq!(tweets, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_missing_text_column() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tweets.csv");
        fs::write(&path, "Text,Hashtag1\nhello,#x\n").unwrap();

        let err = load_tweets_from_csv(&path).unwrap_err();

        assert!(matches!(
            err,
            crate::error::XbotError::Storage(StorageError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_tweets_from_csv(&temp_dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, crate::error::XbotError::Storage(StorageError::Csv(_))));
    }
}
