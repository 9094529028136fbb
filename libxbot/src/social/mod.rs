//! Social network facade
//!
//! The rest of the crate only talks to the network through [`SocialClient`].
//! [`x::XClient`] implements it against the X API v2; [`mock::MockSocialClient`]
//! is a scriptable implementation for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SocialError;

pub mod mock;
pub mod oauth;
pub mod x;

pub type SocialResult<T> = std::result::Result<T, SocialError>;

/// A post returned by search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub author_id: Option<String>,
}

impl Tweet {
    /// First 50 characters of the text, for console and log lines
    pub fn excerpt(&self) -> String {
        excerpt(&self.text, 50)
    }
}

/// A post created by this account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedTweet {
    pub id: String,
    pub text: String,
}

/// The authenticated account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
}

/// Narrow interface over the social network
///
/// Errors are reported as [`SocialError`] so callers can classify them with
/// [`SocialError::kind`].
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Resolve the account behind the configured user credentials
    async fn verify_credentials(&self) -> SocialResult<Account>;

    /// Search recent posts; results are in the order the API returned them
    async fn search(&self, query: &str, max_results: u32) -> SocialResult<Vec<Tweet>>;

    async fn like(&self, tweet_id: &str) -> SocialResult<()>;

    async fn retweet(&self, tweet_id: &str) -> SocialResult<()>;

    async fn post(&self, text: &str) -> SocialResult<PostedTweet>;
}

/// `k1 OR k2 OR ...`
pub fn keyword_query(keywords: &[String]) -> String {
    keywords.join(" OR ")
}

/// `from:a OR from:b OR ...`, in the given order
pub fn from_accounts_query(accounts: &[String]) -> String {
    accounts
        .iter()
        .map(|account| format!("from:{}", account))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Split a comma-separated keyword list, dropping blanks
pub fn parse_keywords(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
