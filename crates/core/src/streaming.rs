//! Unified Stream Event Types
//!
//! Provider-agnostic event types and adapter trait for processing real-time
//! LLM responses. Providers that consume a server-sent-event wire format
//! translate each raw line into these events; the provider then folds the
//! events back into one complete response before anything above it runs.

use serde::{Deserialize, Serialize};

/// Unified streaming event that provider stream adapters convert to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnifiedStreamEvent {
    /// Text content delta from the model
    TextDelta { content: String },

    /// Start of a reasoning block
    ThinkingStart,

    /// Reasoning content delta
    ThinkingDelta { content: String },

    /// End of a reasoning block
    ThinkingEnd,

    /// Start of a tool call
    ToolStart {
        tool_id: String,
        tool_name: String,
    },

    /// Tool call complete with fully accumulated arguments
    ToolComplete {
        tool_id: String,
        tool_name: String,
        /// Complete JSON string of tool arguments
        arguments: String,
    },

    /// Token usage information
    Usage {
        input_tokens: u32,
        output_tokens: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        thinking_tokens: Option<u32>,
    },

    /// Error reported inside the stream
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Stream complete
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    },
}

/// Errors that can occur during stream adaptation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AdapterError {
    /// Invalid format that couldn't be parsed
    InvalidFormat(String),
    /// JSON/data parsing error
    ParseError(String),
    /// Event type not supported by this adapter
    UnsupportedEvent(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AdapterError::UnsupportedEvent(msg) => write!(f, "Unsupported event: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Trait for adapting a provider-specific stream format to unified events.
pub trait StreamAdapter: Send + Sync {
    /// Returns the provider name for logging and identification.
    fn provider_name(&self) -> &'static str;

    /// Returns whether this adapter/provider supports reasoning blocks.
    fn supports_thinking(&self) -> bool;

    /// Returns whether this adapter/provider supports tool calls.
    fn supports_tools(&self) -> bool;

    /// Adapt a raw stream line/chunk to unified events.
    ///
    /// A single input line may produce zero, one, or multiple events.
    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError>;

    /// Reset adapter state for a new stream.
    fn reset(&mut self) {
        // Default implementation does nothing
    }
}
