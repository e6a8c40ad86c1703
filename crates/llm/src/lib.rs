//! Repo Pulse LLM
//!
//! Provides a unified interface for the LLM backends the digest engine can
//! run against:
//! - Anthropic Claude (native tool-use blocks)
//! - OpenAI-style chat completions (streaming tool-call reconstruction)
//!
//! Also includes the conversation-owning session wrapper, the retry wrapper
//! for single remote calls, and the HTTP client factory.

pub mod anthropic;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod retry;
pub mod session;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::{create_provider, LlmProvider};
pub use retry::{with_retry, RetryPolicy};
pub use session::{CallOptions, ProviderSession};
pub use types::*;

// Re-export streaming adapters
pub use streaming_adapters::OpenAIStreamAdapter;
