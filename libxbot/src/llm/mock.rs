//! Mock text generator for testing

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::{GenerationRequest, LlmResult, TextGenerator};
use crate::error::LlmError;

#[derive(Debug)]
struct MockState {
    reply: LlmResult<String>,
    requests: Vec<GenerationRequest>,
}

/// Returns a fixed reply (or error) and records every request
#[derive(Debug, Clone)]
pub struct MockGenerator {
    state: Arc<Mutex<MockState>>,
}

impl MockGenerator {
    pub fn replying(reply: &str) -> Self {
        Self::with_result(Ok(reply.to_string()))
    }

    pub fn failing(error: LlmError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(reply: LlmResult<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                reply,
                requests: Vec::new(),
            })),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> LlmResult<String> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        state.reply.clone()
    }
}
