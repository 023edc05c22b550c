//! Scripted text generator for tests and dry runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::TextGenerator;
use crate::error::LlmError;
use crate::types::{Completion, PhaseRequest, TokenUsage};

/// A mock generator that replays queued outcomes in order.
///
/// Every request is recorded, including those answered with a failure.
/// When the queue runs dry the generator answers with a transport error.
pub struct MockGenerator {
    model: String,
    outcomes: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<PhaseRequest>>,
    delay: Option<Duration>,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            outcomes: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// A generator that answers each call with the next text in `texts`.
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for text in texts {
            mock.push_text(text);
        }
        mock
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_text(&self, text: impl Into<String>) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push_back(Ok(text.into()));
        }
    }

    pub fn push_failure(&self, error: LlmError) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push_back(Err(error));
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<PhaseRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, request: &PhaseRequest) -> Result<Completion, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut outcomes| outcomes.pop_front());
        let text = match next {
            Some(outcome) => outcome?,
            None => return Err(LlmError::transport("mock generator has no scripted response")),
        };

        Ok(Completion {
            usage: TokenUsage {
                input_tokens: (request.prompt_text.len() / 4) as u64,
                output_tokens: (text.len() / 4) as u64,
            },
            text,
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
