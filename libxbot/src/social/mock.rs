//! Mock social client for testing
//!
//! A scriptable [`SocialClient`] that records every call with the tokio clock
//! time it was made. Search and post outcomes can be queued one call at a
//! time; like/retweet failures are configured per tweet id. Clones share state,
//! so a test can keep a handle while the service owns another.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use super::{Account, PostedTweet, SocialClient, SocialResult, Tweet};
use crate::error::SocialError;

/// One recorded facade call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    VerifyCredentials,
    Search { query: String, max_results: u32 },
    Like { tweet_id: String },
    Retweet { tweet_id: String },
    Post { text: String },
}

#[derive(Debug)]
struct MockState {
    account: SocialResult<Account>,
    queued_searches: VecDeque<SocialResult<Vec<Tweet>>>,
    default_search: SocialResult<Vec<Tweet>>,
    action_failures: HashMap<String, SocialError>,
    queued_posts: VecDeque<SocialResult<()>>,
    posted_texts: Vec<String>,
    calls: Vec<(Instant, MockCall)>,
    next_post_id: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            account: Ok(Account {
                id: "1".to_string(),
                username: "mock_user".to_string(),
            }),
            queued_searches: VecDeque::new(),
            default_search: Ok(Vec::new()),
            action_failures: HashMap::new(),
            queued_posts: VecDeque::new(),
            posted_texts: Vec::new(),
            calls: Vec::new(),
            next_post_id: 1,
        }
    }
}

/// Mock social network
#[derive(Debug, Clone, Default)]
pub struct MockSocialClient {
    state: Arc<Mutex<MockState>>,
}

impl MockSocialClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every search without a queued result returns `tweets`
    pub fn with_search_results(self, tweets: Vec<Tweet>) -> Self {
        self.state.lock().unwrap().default_search = Ok(tweets);
        self
    }

    /// Every search without a queued result fails with `error`
    pub fn with_search_error(self, error: SocialError) -> Self {
        self.state.lock().unwrap().default_search = Err(error);
        self
    }

    /// Credential verification fails with `error`
    pub fn with_credentials_error(self, error: SocialError) -> Self {
        self.state.lock().unwrap().account = Err(error);
        self
    }

    /// Queue the outcome of the next unanswered search
    pub fn queue_search(&self, result: SocialResult<Vec<Tweet>>) {
        self.state.lock().unwrap().queued_searches.push_back(result);
    }

    /// Like and retweet of `tweet_id` always fail with `error`
    pub fn fail_action(&self, tweet_id: &str, error: SocialError) {
        self.state
            .lock()
            .unwrap()
            .action_failures
            .insert(tweet_id.to_string(), error);
    }

    /// Queue the outcome of the next unanswered post
    pub fn queue_post(&self, result: SocialResult<()>) {
        self.state.lock().unwrap().queued_posts.push_back(result);
    }

    /// All calls in the order they were made
    pub fn calls(&self) -> Vec<MockCall> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// All calls with the time they were made
    pub fn timed_calls(&self) -> Vec<(Instant, MockCall)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn search_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockCall::Search { .. }))
            .count()
    }

    /// Ids that were liked successfully
    pub fn liked(&self) -> Vec<String> {
        self.successful(|call| match call {
            MockCall::Like { tweet_id } => Some(tweet_id.clone()),
            _ => None,
        })
    }

    /// Ids that were retweeted successfully
    pub fn retweeted(&self) -> Vec<String> {
        self.successful(|call| match call {
            MockCall::Retweet { tweet_id } => Some(tweet_id.clone()),
            _ => None,
        })
    }

    /// Texts that were posted successfully
    pub fn posted(&self) -> Vec<String> {
        self.state.lock().unwrap().posted_texts.clone()
    }

    /// Times of successful likes and retweets
    pub fn action_times(&self) -> Vec<Instant> {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter_map(|(at, call)| match call {
                MockCall::Like { tweet_id } | MockCall::Retweet { tweet_id }
                    if !state.action_failures.contains_key(tweet_id) =>
                {
                    Some(*at)
                }
                _ => None,
            })
            .collect()
    }

    fn successful(&self, select: impl Fn(&MockCall) -> Option<String>) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter_map(|(_, call)| select(call))
            .filter(|id| !state.action_failures.contains_key(id))
            .collect()
    }

    fn record(&self, call: MockCall) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push((Instant::now(), call));
    }

    fn action(&self, call: MockCall, tweet_id: &str) -> SocialResult<()> {
        self.record(call);
        match self.state.lock().unwrap().action_failures.get(tweet_id) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SocialClient for MockSocialClient {
    async fn verify_credentials(&self) -> SocialResult<Account> {
        self.record(MockCall::VerifyCredentials);
        self.state.lock().unwrap().account.clone()
    }

    async fn search(&self, query: &str, max_results: u32) -> SocialResult<Vec<Tweet>> {
        self.record(MockCall::Search {
            query: query.to_string(),
            max_results,
        });
        let mut state = self.state.lock().unwrap();
        match state.queued_searches.pop_front() {
            Some(result) => result,
            None => state.default_search.clone(),
        }
    }

    async fn like(&self, tweet_id: &str) -> SocialResult<()> {
        self.action(
            MockCall::Like {
                tweet_id: tweet_id.to_string(),
            },
            tweet_id,
        )
    }

    async fn retweet(&self, tweet_id: &str) -> SocialResult<()> {
        self.action(
            MockCall::Retweet {
                tweet_id: tweet_id.to_string(),
            },
            tweet_id,
        )
    }

    async fn post(&self, text: &str) -> SocialResult<PostedTweet> {
        self.record(MockCall::Post {
            text: text.to_string(),
        });
        let mut state = self.state.lock().unwrap();
        state.queued_posts.pop_front().unwrap_or(Ok(()))?;

        let id = format!("mock-{}", state.next_post_id);
        state.next_post_id += 1;
        state.posted_texts.push(text.to_string());
        Ok(PostedTweet {
            id,
            text: text.to_string(),
        })
    }
}

/// Build a tweet for tests and demos
pub fn tweet(id: &str, text: &str, author_id: &str) -> Tweet {
    Tweet {
        id: id.to_string(),
        text: text.to_string(),
        author_id: Some(author_id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_search_and_queue() {
        let client = MockSocialClient::new().with_search_results(vec![tweet("1", "hello", "a")]);
        client.queue_search(Err(SocialError::RateLimited("slow".to_string())));

        assert!(client.search("q", 10).await.is_err());
        assert_eq!(client.search("q", 10).await.unwrap().len(), 1);
        assert_eq!(client.search_count(), 2);
    }

    #[tokio::test]
    async fn test_action_failures_are_per_item() {
        let client = MockSocialClient::new();
        client.fail_action("bad", SocialError::Forbidden("protected".to_string()));

        assert!(client.like("bad").await.is_err());
        assert!(client.like("good").await.is_ok());
        assert!(client.retweet("good2").await.is_ok());

        assert_eq!(client.liked(), vec!["good".to_string()]);
        assert_eq!(client.retweeted(), vec!["good2".to_string()]);
        assert_eq!(client.action_times().len(), 2);
    }

    #[tokio::test]
    async fn test_post_queue_then_success() {
        let client = MockSocialClient::new();
        client.queue_post(Err(SocialError::Api("boom".to_string())));

        assert!(client.post("first").await.is_err());
        let posted = client.post("second").await.unwrap();

        assert_eq!(posted.id, "mock-1");
        assert_eq!(client.posted(), vec!["second".to_string()]);
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_credentials_error() {
        let client = MockSocialClient::new()
            .with_credentials_error(SocialError::Unauthorized("revoked".to_string()));
        assert!(client.verify_credentials().await.is_err());
        assert_eq!(client.calls(), vec![MockCall::VerifyCredentials]);
    }
}
