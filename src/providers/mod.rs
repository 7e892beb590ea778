/*!
 * Provider implementations for the text-generation capability.
 *
 * This module contains the request/response shapes the translation engine
 * speaks and the clients that serve them:
 * - Anthropic: Messages API client
 * - Mock: in-process provider for tests and dry runs
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Generation request sent to a provider
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// The model to use
    pub model: String,

    /// Maximum number of tokens to generate
    pub max_tokens: u32,

    /// The messages for the conversation
    pub messages: Vec<Message>,
}

impl GenerationRequest {
    /// Create a new request
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            messages: Vec::new(),
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(Message {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Content of the last user message
    pub fn user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }
}

/// One typed segment of a response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentSegment {
    /// Segment type, e.g. "text" or "tool_use"
    #[serde(rename = "type")]
    pub segment_type: String,

    /// Text payload, present on text segments
    #[serde(default)]
    pub text: Option<String>,
}

impl ContentSegment {
    /// A text segment
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            segment_type: "text".to_string(),
            text: Some(text.into()),
        }
    }
}

/// Generation response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResponse {
    /// Response segments in order
    pub content: Vec<ContentSegment>,
}

impl GenerationResponse {
    /// First text-typed segment; all other segments are ignored
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|c| c.segment_type == "text")
            .and_then(|c| c.text.as_deref())
    }
}

/// Common trait for all text-generation providers
///
/// The translation engine is generic over this trait so the Anthropic client
/// and the mock can be used interchangeably.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<GenerationResponse, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError>;

    /// Send a minimal request to check credentials and reachability
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

pub mod anthropic;
pub mod mock;
