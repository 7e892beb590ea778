/*!
 * Mock provider implementation for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with "translated" text
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::empty()` - Succeeds without any text segment
 * - `MockProvider::dropping_placeholders()` - Paraphrases the code tokens away
 * - `MockProvider::slow(ms)` - Succeeds after a delay
 *
 * The mock reads the note body out of the prompt, so callers see the same
 * guarded text a real model would.
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{ContentSegment, GenerationRequest, GenerationResponse, Provider};
use crate::translation::prompts::PromptTemplate;

static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"⟦+CODE_\d+⟧").unwrap());

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Always fails with an error
    Failing,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Returns no text segment at all
    Empty,
    /// Translates but loses every placeholder token
    DropPlaceholders,
    /// Simulates slow response (for concurrency and timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter
    request_count: Arc<AtomicUsize>,
    /// Requests currently being served
    in_flight: Arc<AtomicUsize>,
    /// Highest value `in_flight` has reached
    peak_in_flight: Arc<AtomicUsize>,
    /// Bodies received, in arrival order
    received: Arc<Mutex<Vec<String>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock whose responses carry no text segment
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that drops placeholder tokens from its output
    pub fn dropping_placeholders() -> Self {
        Self::new(MockBehavior::DropPlaceholders)
    }

    /// Create a mock that answers after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator; it receives the guarded body
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Largest number of requests that were in flight at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Bodies received so far
    pub fn received_bodies(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Extract the note body from a rendered prompt
    pub fn body_from_prompt(prompt: &str) -> String {
        let start = prompt
            .find(PromptTemplate::BODY_OPEN)
            .map(|i| i + PromptTemplate::BODY_OPEN.len());
        let end = prompt.rfind(PromptTemplate::BODY_CLOSE);
        match (start, end) {
            (Some(start), Some(end)) if start <= end => prompt[start..end].to_string(),
            _ => prompt.to_string(),
        }
    }

    fn translate(&self, body: &str) -> String {
        match self.custom_response {
            Some(generator) => generator(body),
            None => format!("[TRANSLATED] {}", body),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            in_flight: Arc::clone(&self.in_flight),
            peak_in_flight: Arc::clone(&self.peak_in_flight),
            received: Arc::clone(&self.received),
            custom_response: self.custom_response,
        }
    }
}

/// Decrements the in-flight counter however the request ends
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _in_flight = InFlight(Arc::clone(&self.in_flight));

        let body = Self::body_from_prompt(request.user_content().unwrap_or_default());
        self.received.lock().push(body.clone());

        let text = match self.behavior {
            MockBehavior::Working => self.translate(&body),
            MockBehavior::Failing => {
                return Err(ProviderError::ApiError {
                    message: "Simulated provider failure".to_string(),
                    status_code: 500,
                });
            }
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    return Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    });
                }
                self.translate(&body)
            }
            MockBehavior::Empty => {
                return Ok(GenerationResponse {
                    content: vec![ContentSegment {
                        segment_type: "tool_use".to_string(),
                        text: None,
                    }],
                });
            }
            MockBehavior::DropPlaceholders => PLACEHOLDER_REGEX.replace_all(&self.translate(&body), "").into_owned(),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                self.translate(&body)
            }
        };

        Ok(GenerationResponse {
            content: vec![ContentSegment::text(text)],
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated outage".to_string())),
            _ => Ok(()),
        }
    }
}
