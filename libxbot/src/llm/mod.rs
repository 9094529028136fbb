//! Language-model facade and the shared-secret gate in front of it

use async_trait::async_trait;

use crate::error::LlmError;

pub mod gate;
pub mod mock;
pub mod openai;

pub use gate::LlmGate;

pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// One text-generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_text: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> LlmResult<String>;
}
