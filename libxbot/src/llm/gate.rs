//! Shared-secret gate in front of the text generator
//!
//! A request is forwarded only if it contains the configured secret word
//! (case-insensitive). The secret is stripped before forwarding and the reply
//! is cut to the display limit.
//!
//! This is a capability check by token embedded in the payload. It keeps
//! casual misuse out of an interactive tool; it is not access control.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use super::{GenerationRequest, TextGenerator};
use crate::config::LlmConfig;

pub const RESPONSE_REFUSAL: &str =
    "I can only provide general Twitter-related information without proper authorization.";
pub const POST_REFUSAL: &str = "Tweet generation requires proper authorization.";

const ELLIPSIS: &str = "...";

pub struct LlmGate {
    generator: Arc<dyn TextGenerator>,
    secret: SecretString,
    settings: LlmConfig,
}

impl LlmGate {
    pub fn new(generator: Arc<dyn TextGenerator>, secret: SecretString, settings: LlmConfig) -> Self {
        Self {
            generator,
            secret,
            settings,
        }
    }

    /// Whether `text` carries the secret word
    pub fn is_authorized(&self, text: &str) -> bool {
        let secret = self.secret.expose_secret();
        !secret.is_empty() && find_ignore_case(text, secret).is_some()
    }

    /// Answer a free-form message
    pub async fn respond(&self, message: &str) -> String {
        if !self.is_authorized(message) {
            tracing::warn!("Unauthorized LLM access attempt");
            return RESPONSE_REFUSAL.to_string();
        }

        let cleaned = self.strip_secret(message);
        self.complete(cleaned, self.settings.response_max_tokens, "LLM processing")
            .await
    }

    /// Draft a post (text plus hashtags) from a prompt
    pub async fn generate_post(&self, prompt: &str) -> String {
        if !self.is_authorized(prompt) {
            tracing::warn!("Unauthorized tweet generation attempt");
            return POST_REFUSAL.to_string();
        }

        let cleaned = self.strip_secret(prompt);
        let instruction = format!(
            "Generate a Twitter post based on this prompt: {}, only reply with the tweet and hashtags, nothing else",
            cleaned
        );
        self.complete(instruction, self.settings.post_max_tokens, "tweet generation")
            .await
    }

    /// Summarize a batch of posts about `keywords`
    pub async fn summarize(&self, keywords: &[String], texts: &[String]) -> String {
        let prompt = format!(
            "{} Create a brief summary of these tweets about {}:\n{}",
            self.secret.expose_secret(),
            keywords.join(", "),
            texts.join("\n")
        );
        self.respond(&prompt).await
    }

    async fn complete(&self, user_text: String, max_tokens: u32, context: &str) -> String {
        let request = GenerationRequest {
            system_prompt: self.settings.system_prompt.clone(),
            user_text,
            temperature: self.settings.temperature,
            max_tokens,
        };

        match self.generator.generate(&request).await {
            Ok(text) => truncate_for_display(&text, self.settings.display_limit),
            Err(e) => {
                tracing::error!("Error in {}: {}", context, e);
                format!("Sorry, I encountered an error: {}", e)
            }
        }
    }

    fn strip_secret(&self, text: &str) -> String {
        let secret = self.secret.expose_secret();
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some((start, end)) = find_ignore_case(rest, secret) {
            out.push_str(&rest[..start]);
            rest = &rest[end..];
        }
        out.push_str(rest);
        out.trim().to_string()
    }
}

/// Cut `text` to at most `limit` characters, ending in `...` when shortened
pub fn truncate_for_display(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    // Limits below the marker length get a shortened marker
    out.push_str(&ELLIPSIS[..limit - keep]);
    out
}

/// Byte range of the first case-insensitive match of `needle`
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .char_indices()
        .find_map(|(start, _)| match_len(&haystack[start..], needle).map(|len| (start, start + len)))
}

fn match_len(haystack: &str, needle: &str) -> Option<usize> {
    let mut chars = haystack.char_indices();
    for expected in needle.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(chars.next().map(|(i, _)| i).unwrap_or(haystack.len()))
}
