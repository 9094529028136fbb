//! OpenAI-compatible chat-completions client

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{GenerationRequest, LlmResult, TextGenerator};
use crate::error::LlmError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiClient {
    pub fn new(endpoint: &str, model: &str, api_key: SecretString) -> LlmResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    fn payload(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_text },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, request: &GenerationRequest) -> LlmResult<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.payload(request))
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!(
                "{} {}",
                status,
                crate::social::excerpt(body.trim(), 320)
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Api(format!("invalid response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}
