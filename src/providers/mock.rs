/*!
 * Mock provider for testing.
 *
 * The provider replies with queued responses in order. Once the queue is
 * empty it repeats the fallback response. Behaviors simulate failures:
 * - `MockProvider::new()` - Always answers
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::intermittent(n)` - Fails every nth request
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{ChatRequest, ChatResponse, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always answers
    Working,
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
}

#[derive(Debug, Default)]
struct MockState {
    responses: VecDeque<String>,
    requests: Vec<ChatRequest>,
}

/// Mock provider with scripted responses
///
/// Clones share the queue, the recorded requests and the request counter.
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    fallback: String,
    request_count: Arc<AtomicUsize>,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::with_behavior(MockBehavior::Working)
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            fallback: "{}".to_string(),
            request_count: Arc::new(AtomicUsize::new(0)),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn failing() -> Self {
        Self::with_behavior(MockBehavior::Failing)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::with_behavior(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    /// Response used once the queue runs dry
    pub fn with_fallback(mut self, response: impl Into<String>) -> Self {
        self.fallback = response.into();
        self
    }

    /// Queue a response
    pub fn push_response(&self, response: impl Into<String>) {
        self.state.lock().responses.push_back(response.into());
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Requests received so far, including failed ones
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.state.lock().requests.clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let prompt_tokens = request.messages.iter().map(|m| m.content.len() as u64).sum();

        let mut state = self.state.lock();
        state.requests.push(request);

        let fails = match self.behavior {
            MockBehavior::Working => false,
            MockBehavior::Failing => true,
            MockBehavior::Intermittent { fail_every } => count % fail_every == fail_every - 1,
        };
        if fails {
            return Err(ProviderError::ApiError {
                message: format!("Simulated provider failure (request #{})", count + 1),
                status_code: 503,
            });
        }

        let text = state.responses.pop_front().unwrap_or_else(|| self.fallback.clone());
        Ok(ChatResponse {
            completion_tokens: Some(text.len() as u64),
            prompt_tokens: Some(prompt_tokens),
            text,
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated connection failure".to_string())),
            _ => Ok(()),
        }
    }
}
