//! X API v2 client
//!
//! Search uses the app-only bearer token. Everything that acts as the user
//! (resolving the account, likes, retweets, creating posts) is signed with
//! OAuth 1.0a.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::oauth::{self, Nonce, SigningKeys};
use super::{Account, PostedTweet, SocialClient, SocialResult, Tweet};
use crate::credentials::XCredentials;
use crate::error::SocialError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("xbot/", env!("CARGO_PKG_VERSION"));

/// Limits the recent-search endpoint accepts for `max_results`
const SEARCH_MIN_RESULTS: u32 = 10;
const SEARCH_MAX_RESULTS: u32 = 100;

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    data: Vec<ApiTweet>,
}

#[derive(Debug, Deserialize)]
struct ApiTweet {
    id: String,
    text: String,
    author_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct ApiCreatedTweet {
    id: String,
    text: String,
}

/// Map an unsuccessful HTTP status to a [`SocialError`]
///
/// - 401 → `Unauthorized` (bad or revoked credentials)
/// - 403 → `Forbidden`; error code 453 means the app's access tier does not
///   include the endpoint
/// - 429 → `RateLimited`
/// - anything else → `Api`
pub fn map_status(status: u16, body: &str, context: &str) -> SocialError {
    let detail = truncate_body(body);
    match status {
        401 => SocialError::Unauthorized(format!(
            "X rejected the credentials during {}: {}. Please verify your API keys and tokens.",
            context, detail
        )),
        403 if body.contains("453") => SocialError::Forbidden(format!(
            "API access level error during {}: your X API access tier does not include this endpoint",
            context
        )),
        403 => SocialError::Forbidden(format!("X refused {}: {}", context, detail)),
        429 => SocialError::RateLimited(format!(
            "X rate limit reached during {}: {}",
            context, detail
        )),
        _ => SocialError::Api(format!(
            "X returned HTTP {} during {}: {}",
            status, context, detail
        )),
    }
}

fn map_transport(error: reqwest::Error, context: &str) -> SocialError {
    SocialError::Network(format!("Request to X failed during {}: {}", context, error))
}

fn truncate_body(body: &str) -> String {
    super::excerpt(body.trim(), 300)
}

pub struct XClient {
    http: reqwest::Client,
    api_base: String,
    credentials: XCredentials,
    user_id: OnceCell<String>,
}

impl XClient {
    /// Create a client for the API rooted at `api_base`
    /// (normally `https://api.twitter.com`)
    pub fn new(api_base: &str, credentials: XCredentials) -> SocialResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SocialError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials,
            user_id: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn user_auth(&self, method: &str, url: &str) -> SocialResult<String> {
        let keys = SigningKeys::from_credentials(&self.credentials);
        oauth::authorization_header(&keys, method, url, &[], &Nonce::generate())
    }

    async fn check(response: reqwest::Response, context: &str) -> SocialResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let error = map_status(status.as_u16(), &body, context);
        tracing::debug!("X API error during {}: {}", context, error);
        Err(error)
    }

    async fn signed_post(
        &self,
        path: &str,
        body: serde_json::Value,
        context: &str,
    ) -> SocialResult<reqwest::Response> {
        let url = self.url(path);
        let auth = self.user_auth("POST", &url)?;

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport(e, context))?;

        Self::check(response, context).await
    }

    async fn fetch_account(&self) -> SocialResult<Account> {
        let context = "account lookup";
        let url = self.url("/2/users/me");
        let auth = self.user_auth("GET", &url)?;

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| map_transport(e, context))?;
        let response = Self::check(response, context).await?;

        let envelope: DataEnvelope<ApiUser> = response
            .json()
            .await
            .map_err(|e| SocialError::Api(format!("Invalid response during {}: {}", context, e)))?;

        Ok(Account {
            id: envelope.data.id,
            username: envelope.data.username,
        })
    }

    async fn user_id(&self) -> SocialResult<&str> {
        let id = self
            .user_id
            .get_or_try_init(|| async { self.fetch_account().await.map(|account| account.id) })
            .await?;
        Ok(id.as_str())
    }
}

#[async_trait]
impl SocialClient for XClient {
    async fn verify_credentials(&self) -> SocialResult<Account> {
        let account = self.fetch_account().await?;
        let _ = self.user_id.set(account.id.clone());
        Ok(account)
    }

    async fn search(&self, query: &str, max_results: u32) -> SocialResult<Vec<Tweet>> {
        let context = "search";
        let max_results = max_results
            .clamp(SEARCH_MIN_RESULTS, SEARCH_MAX_RESULTS)
            .to_string();

        let response = self
            .http
            .get(self.url("/2/tweets/search/recent"))
            .bearer_auth(self.credentials.bearer_token.expose_secret())
            .query(&[
                ("query", query),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "text,author_id"),
            ])
            .send()
            .await
            .map_err(|e| map_transport(e, context))?;
        let response = Self::check(response, context).await?;

        let envelope: SearchEnvelope = response
            .json()
            .await
            .map_err(|e| SocialError::Api(format!("Invalid search response: {}", e)))?;

        Ok(envelope
            .data
            .into_iter()
            .map(|t| Tweet {
                id: t.id,
                text: t.text,
                author_id: t.author_id,
            })
            .collect())
    }

    async fn like(&self, tweet_id: &str) -> SocialResult<()> {
        let user_id = self.user_id().await?;
        let path = format!("/2/users/{}/likes", user_id);
        self.signed_post(&path, json!({ "tweet_id": tweet_id }), "like")
            .await?;
        Ok(())
    }

    async fn retweet(&self, tweet_id: &str) -> SocialResult<()> {
        let user_id = self.user_id().await?;
        let path = format!("/2/users/{}/retweets", user_id);
        self.signed_post(&path, json!({ "tweet_id": tweet_id }), "retweet")
            .await?;
        Ok(())
    }

    async fn post(&self, text: &str) -> SocialResult<PostedTweet> {
        let context = "post";
        let response = self
            .signed_post("/2/tweets", json!({ "text": text }), context)
            .await?;

        let envelope: DataEnvelope<ApiCreatedTweet> = response
            .json()
            .await
            .map_err(|e| SocialError::Api(format!("Invalid response during {}: {}", context, e)))?;

        Ok(PostedTweet {
            id: envelope.data.id,
            text: envelope.data.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_status_unauthorized() {
        let error = map_status(401, "{\"title\":\"Unauthorized\"}", "search");
        assert!(matches!(error, SocialError::Unauthorized(_)));
        assert!(error.to_string().contains("search"));
    }

    #[test]
    fn test_map_status_access_level() {
        let body = r#"{"errors":[{"code":453,"message":"You currently have access to a subset of X API V2 endpoints"}]}"#;
        let error = map_status(403, body, "post");
        assert!(matches!(error, SocialError::Forbidden(_)));
        assert!(error.to_string().contains("API access level error"));
    }

    #[test]
    fn test_map_status_forbidden_and_rate_limit() {
        assert!(matches!(
            map_status(403, "not allowed", "like"),
            SocialError::Forbidden(_)
        ));
        assert!(matches!(
            map_status(429, "Too Many Requests", "search"),
            SocialError::RateLimited(_)
        ));
        assert!(matches!(
            map_status(503, "Service Unavailable", "search"),
            SocialError::Api(_)
        ));
    }
}
