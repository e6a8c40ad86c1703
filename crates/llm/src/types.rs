//! LLM Types
//!
//! The conversation, tool, and error vocabulary shared by every provider.
//! Nothing in here is wire-specific; the providers translate these types to
//! and from their own request/response shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// The closed set of LLM backends the engine can run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Anthropic,
    OpenAI,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Anthropic => write!(f, "anthropic"),
            ProviderType::OpenAI => write!(f, "openai"),
        }
    }
}

impl FromStr for ProviderType {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(ProviderType::Anthropic),
            "openai" => Ok(ProviderType::OpenAI),
            other => Err(LlmError::InvalidRequest {
                message: format!("unknown LLM provider: {}", other),
            }),
        }
    }
}

/// Per-request options for provider behavior.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmRequestOptions {
    /// Constrain the response to a JSON object. Providers with native
    /// structured-output support enforce this at the API level; others rely
    /// on the prompt requesting strict JSON.
    #[serde(default)]
    pub json_mode: bool,
    /// Optional temperature override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_override: Option<f32>,
}

/// Configuration for an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The provider type
    pub provider: ProviderType,
    /// API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model name to use
    pub model: String,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Hard wall-clock timeout per remote call attempt, in seconds.
    /// Exceeding it aborts the attempt as a retryable network error.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Provider-specific options
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.3
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::Anthropic,
            api_key: None,
            base_url: None,
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
            options: HashMap::new(),
        }
    }
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Content type within a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text content
    Text { text: String },
    /// Tool use request from the assistant
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Tool result answering a prior tool use
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Message content (can be multiple blocks)
    pub content: Vec<MessageContent>,
}

impl Message {
    /// Create a simple text message
    pub fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![MessageContent::Text { text: text.into() }],
        }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(MessageRole::User, text)
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(MessageRole::Assistant, text)
    }

    /// Create an assistant message carrying tool invocations, with optional
    /// leading text.
    pub fn assistant_with_tools(text: Option<String>, tool_calls: &[ToolCall]) -> Self {
        let mut content = Vec::new();
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            content.push(MessageContent::Text { text });
        }
        for call in tool_calls {
            content.push(MessageContent::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.arguments.clone(),
            });
        }
        Self {
            role: MessageRole::Assistant,
            content,
        }
    }

    /// Create a tool result message
    pub fn tool_result(
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self {
            role: MessageRole::User,
            content: vec![MessageContent::ToolResult {
                tool_use_id: tool_use_id.into(),
                content: content.into(),
                is_error: if is_error { Some(true) } else { None },
            }],
        }
    }

    /// Tool-use ids carried by this message, in order.
    pub fn tool_use_ids(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|c| match c {
                MessageContent::ToolUse { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// JSON Schema for tool parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, ParameterSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterSchema>>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl ParameterSchema {
    /// Create a string schema
    pub fn string(description: Option<&str>) -> Self {
        Self {
            schema_type: "string".to_string(),
            description: description.map(|s| s.to_string()),
            properties: None,
            required: None,
            items: None,
            max_items: None,
        }
    }

    /// Create an object schema
    pub fn object(
        description: Option<&str>,
        properties: HashMap<String, ParameterSchema>,
        required: Vec<String>,
    ) -> Self {
        Self {
            schema_type: "object".to_string(),
            description: description.map(|s| s.to_string()),
            properties: Some(properties),
            required: Some(required),
            items: None,
            max_items: None,
        }
    }

    /// Create an array schema
    pub fn array(description: Option<&str>, items: ParameterSchema) -> Self {
        Self {
            schema_type: "array".to_string(),
            description: description.map(|s| s.to_string()),
            properties: None,
            required: None,
            items: Some(Box::new(items)),
            max_items: None,
        }
    }

    /// Limit an array schema to at most `max` items.
    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }
}

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema for the tool's input parameters
    pub input_schema: ParameterSchema,
}

/// A tool call requested by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Name of the tool to call
    pub name: String,
    /// Arguments to pass to the tool
    pub arguments: serde_json::Value,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Number of input/prompt tokens
    pub input_tokens: u32,
    /// Number of output/completion tokens
    pub output_tokens: u32,
    /// Number of reasoning tokens (if reported)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_tokens: Option<u32>,
}

impl UsageStats {
    /// Total tokens used
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens + self.thinking_tokens.unwrap_or(0)
    }
}

/// Stop reason for the response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response
    EndTurn,
    /// Hit max tokens limit
    MaxTokens,
    /// Stopped at a stop sequence
    StopSequence,
    /// Model wants to use a tool
    ToolUse,
    /// Other/unknown reason
    Other(String),
}

impl From<&str> for StopReason {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "end_turn" | "stop" => StopReason::EndTurn,
            "max_tokens" | "length" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            "tool_use" | "tool_calls" | "function_call" => StopReason::ToolUse,
            other => StopReason::Other(other.to_string()),
        }
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Text content of the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Reasoning content (if the model emits any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Tool calls requested by the model
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Why the response ended
    pub stop_reason: StopReason,
    /// Token usage statistics
    pub usage: UsageStats,
    /// The model that generated the response
    pub model: String,
}

impl LlmResponse {
    /// Check if the response has tool calls
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Errors from remote model calls and their orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (invalid API key)
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },
    /// Model not found or not available
    ModelNotFound { model: String },
    /// Invalid request (bad parameters)
    InvalidRequest { message: String },
    /// Server error from the provider
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error, including per-attempt timeouts
    NetworkError { message: String },
    /// Response parsing error at the wire level
    ParseError { message: String },
    /// Provider endpoint unreachable or overloaded
    ProviderUnavailable { message: String },
    /// A JSON-mode response did not parse into the expected shape
    MalformedResponse { message: String },
    /// All retry attempts were consumed; wraps the last underlying error
    RetriesExhausted { attempts: u32, last: Box<LlmError> },
    /// Other error
    Other { message: String },
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message, .. } => {
                write!(f, "Rate limited: {}", message)
            }
            LlmError::ModelNotFound { model } => {
                write!(f, "Model not found: {}", model)
            }
            LlmError::InvalidRequest { message } => {
                write!(f, "Invalid request: {}", message)
            }
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            LlmError::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            LlmError::ProviderUnavailable { message } => {
                write!(f, "Provider unavailable: {}", message)
            }
            LlmError::MalformedResponse { message } => {
                write!(f, "Malformed structured response: {}", message)
            }
            LlmError::RetriesExhausted { attempts, last } => {
                write!(f, "Retries exhausted after {} attempts: {}", attempts, last)
            }
            LlmError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    /// Whether this error is transient and the call should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::NetworkError { .. }
                | LlmError::RateLimited { .. }
                | LlmError::ServerError { .. }
                | LlmError::ProviderUnavailable { .. }
        )
    }

    /// For rate-limited errors, the suggested wait time in seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        if let LlmError::RateLimited { retry_after, .. } = self {
            retry_after.map(|s| s as u64)
        } else {
            None
        }
    }
}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
