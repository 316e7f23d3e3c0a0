//! Extraction collaborator boundary
//!
//! The collaborator is a black-box language model reached over HTTP. The rest
//! of the portal only needs one operation from it: send a chat request, get
//! back the text of the first reply.

pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completion request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// No API credential is held by the server
    #[error("OpenAI API key not configured on server")]
    NotConfigured,

    /// Transport failure (connect, timeout, body read)
    #[error("Collaborator request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Collaborator returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Success status but a body of unexpected shape
    #[error("Unexpected collaborator response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Send a chat request and return the first choice's message content
    async fn complete(&self, request: &ChatRequest) -> Result<String, CollaboratorError>;
}
