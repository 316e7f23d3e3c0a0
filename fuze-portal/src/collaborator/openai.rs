//! OpenAI-compatible HTTP client
//!
//! Used two ways: as the [`Collaborator`] behind the reconciliation pass, and
//! as a raw relay behind the `/api/chat` and `/api/transcribe` proxies, which
//! keep the API key on the server.

use super::{ChatRequest, Collaborator, CollaboratorError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("fuze-portal/", env!("CARGO_PKG_VERSION"));

/// Long transcripts with a 4096-token reply can take a while
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Upload file name the transcription endpoint sees
const AUDIO_FILE_NAME: &str = "audio.webm";

pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    /// Check if API key is configured
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, CollaboratorError> {
        self.api_key.as_deref().ok_or(CollaboratorError::NotConfigured)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn check(response: Response) -> Result<Response, CollaboratorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CollaboratorError::Upstream {
            status: status.as_u16(),
            body,
        })
    }

    async fn json_body(response: Response) -> Result<Value, CollaboratorError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| CollaboratorError::Parse(e.to_string()))
    }

    /// Forward a chat-completion body untouched and return the upstream JSON
    pub async fn relay_chat(&self, body: &Value) -> Result<Value, CollaboratorError> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;
        Self::json_body(Self::check(response).await?).await
    }

    /// Forward an audio upload to the transcription endpoint
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        content_type: Option<&str>,
        model: &str,
    ) -> Result<Value, CollaboratorError> {
        let api_key = self.api_key()?;
        debug!(bytes = audio.len(), model, "Relaying audio for transcription");

        let part = Part::bytes(audio)
            .file_name(AUDIO_FILE_NAME)
            .mime_str(content_type.unwrap_or("application/octet-stream"))?;
        let form = Form::new().part("file", part).text("model", model.to_string());

        let response = self
            .client
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;
        Self::json_body(Self::check(response).await?).await
    }
}

#[async_trait]
impl Collaborator for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, CollaboratorError> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Parse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CollaboratorError::Parse("Reply has no message content".to_string()))
    }
}
