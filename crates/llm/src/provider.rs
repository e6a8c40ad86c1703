//! LLM Provider Trait
//!
//! Defines the common interface for all LLM providers.

use std::sync::Arc;

use async_trait::async_trait;

use super::anthropic::AnthropicProvider;
use super::openai::OpenAIProvider;
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig, ProviderType,
    ToolDefinition,
};

/// Trait that all LLM providers must implement.
///
/// A provider encapsulates one backend's wire format: request body shape,
/// tool-calling schema, and streaming quirks. Providers are stateless; the
/// conversation lives in [`crate::session::ProviderSession`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Returns whether this provider supports tool calling.
    fn supports_tools(&self) -> bool;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;

    /// Send the conversation and get one complete response.
    ///
    /// # Arguments
    /// * `messages` - Conversation history
    /// * `system` - Optional system prompt
    /// * `tools` - Available tools for the model to use (empty disables tools)
    /// * `options` - Per-request behavior switches
    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;
}

/// Instantiate the provider selected by the configuration.
///
/// The provider set is closed; selection is a pure mapping from the
/// configuration enum to a constructor. Unknown provider names already fail
/// when parsing [`ProviderType`], before this point.
pub fn create_provider(config: ProviderConfig) -> Arc<dyn LlmProvider> {
    match config.provider {
        ProviderType::Anthropic => Arc::new(AnthropicProvider::new(config)),
        ProviderType::OpenAI => Arc::new(OpenAIProvider::new(config)),
    }
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        529 => LlmError::ProviderUnavailable {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
