//! Generation service for interacting with AI models
//!
//! Agents never talk to a provider directly: every call goes through a
//! [`GenerationService`], which maps one prompt to one text response.

use async_trait::async_trait;
use conclave_common::GenerationError;
use genai::Client as GenaiClient;
use genai::chat::{ChatMessage as GenaiChatMessage, ChatOptions, ChatRequest, MessageContent};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model that should answer
    pub model: String,

    /// Profile prompt selected from the agent's role
    pub system_prompt: Option<String>,

    /// Fully assembled user prompt
    pub user_prompt: String,
}

impl GenerationRequest {
    pub fn new(
        model: impl Into<String>,
        system_prompt: Option<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system_prompt,
            user_prompt: user_prompt.into(),
        }
    }

    /// System and user prompt concatenated into the single text actually sent
    pub fn combined_prompt(&self) -> String {
        match &self.system_prompt {
            Some(system) if !system.trim().is_empty() => {
                format!("{}\n\nUser: {}", system, self.user_prompt)
            }
            _ => self.user_prompt.clone(),
        }
    }
}

/// A trait for services that turn a prompt into generated text
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate a response for one request
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Map a provider error message onto the generation error taxonomy
pub fn classify_provider_error(message: &str) -> GenerationError {
    let lowered = message.to_lowercase();
    let quota_markers = [
        "rate limit",
        "too many requests",
        "429",
        "quota",
        "resource exhausted",
        "resource_exhausted",
    ];
    let config_markers = ["api key", "api_key", "unauthorized", "401", "permission denied"];

    if quota_markers.iter().any(|marker| lowered.contains(marker)) {
        GenerationError::Quota(message.to_string())
    } else if config_markers.iter().any(|marker| lowered.contains(marker)) {
        GenerationError::Configuration(message.to_string())
    } else {
        GenerationError::Service(message.to_string())
    }
}

/// Production generation service backed by the `genai` client
pub struct GenaiService {
    /// Underlying client for the LLM
    client: GenaiClient,
}

impl GenaiService {
    /// Create a new service; provider credentials are read by `genai` from the environment.
    ///
    /// Calls carry no deadline of their own; callers bound them.
    pub fn new() -> Self {
        let client = GenaiClient::builder()
            .with_chat_options(ChatOptions {
                capture_content: Some(true),
                capture_usage: Some(true),
                ..Default::default()
            })
            .build();

        Self { client }
    }
}

impl Default for GenaiService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationService for GenaiService {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        // The profile prompt travels inside the user turn, not as a separate system message
        let chat_req = ChatRequest::new(vec![GenaiChatMessage::user(request.combined_prompt())]);

        debug!("Executing chat request against model: {}", request.model);

        let response = self
            .client
            .exec_chat(&request.model, chat_req, None)
            .await
            .map_err(|e| classify_provider_error(&format!("GenAI API error: {}", e)))?;

        debug!("Response usage: {:?}", response.usage);

        response
            .content
            .first()
            .cloned()
            .and_then(MessageContent::into_text)
            .ok_or_else(|| GenerationError::Service("No text content in chat response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_prompt_layout() {
        let request = GenerationRequest::new("m", Some("Be brief.".to_string()), "Hi");
        assert_eq!(request.combined_prompt(), "Be brief.\n\nUser: Hi");

        let bare = GenerationRequest::new("m", None, "Hi");
        assert_eq!(bare.combined_prompt(), "Hi");

        let blank = GenerationRequest::new("m", Some("  ".to_string()), "Hi");
        assert_eq!(blank.combined_prompt(), "Hi");
    }

    #[test]
    fn test_classify_provider_error() {
        assert!(matches!(
            classify_provider_error("HTTP 429 Too Many Requests"),
            GenerationError::Quota(_)
        ));
        assert!(matches!(
            classify_provider_error("RESOURCE_EXHAUSTED: quota exceeded"),
            GenerationError::Quota(_)
        ));
        assert!(matches!(
            classify_provider_error("API key not valid"),
            GenerationError::Configuration(_)
        ));
        assert!(matches!(
            classify_provider_error("connection reset"),
            GenerationError::Service(_)
        ));
    }

    #[test]
    fn test_genai_service_init() {
        let _service = GenaiService::default();
    }
}
