//! Provider Session
//!
//! The conversation-owning wrapper over a stateless provider. One session
//! drives exactly one generation call at a time: turns are appended in
//! strict call order, a tool turn must answer a pending invocation from the
//! most recent assistant turn, and `reset` wipes the transcript between
//! independent chunks or phases so tool context never leaks across them.

use std::sync::Arc;

use repo_pulse_core::summary::StructuredSummary;

use super::provider::LlmProvider;
use super::retry::{with_retry, RetryPolicy};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ToolCall, ToolDefinition,
};

/// Options for one session call.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// System directive sent alongside the conversation.
    pub system_prompt: Option<String>,
    /// Offer the session's tool set to the model.
    pub enable_tools: bool,
    /// Constrain the response to the structured-summary JSON shape.
    pub json_mode: bool,
}

impl CallOptions {
    /// Tools offered, free-text response expected.
    pub fn with_tools(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
            enable_tools: true,
            json_mode: false,
        }
    }

    /// No tools, free-text response expected.
    pub fn plain(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
            enable_tools: false,
            json_mode: false,
        }
    }

    /// No tools, JSON response expected.
    pub fn json(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
            enable_tools: false,
            json_mode: true,
        }
    }
}

/// A conversation bound to one provider instance.
pub struct ProviderSession {
    provider: Arc<dyn LlmProvider>,
    tools: Vec<ToolDefinition>,
    retry: RetryPolicy,
    messages: Vec<Message>,
}

impl ProviderSession {
    /// Create an empty session over `provider`, offering `tools` whenever a
    /// call enables them.
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Vec<ToolDefinition>) -> Self {
        Self {
            provider,
            tools,
            retry: RetryPolicy::default(),
            messages: Vec::new(),
        }
    }

    /// Override the retry discipline applied to each remote call.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send the accumulated conversation to the model.
    ///
    /// Transient failures are retried inside this call; the transcript is
    /// left untouched either way, so the caller decides what to append.
    pub async fn call(&self, options: &CallOptions) -> LlmResult<LlmResponse> {
        let tools: Vec<ToolDefinition> = if options.enable_tools {
            self.tools.clone()
        } else {
            Vec::new()
        };
        let request_options = LlmRequestOptions {
            json_mode: options.json_mode,
            ..Default::default()
        };

        with_retry(&self.retry, || {
            self.provider.send_message(
                self.messages.clone(),
                options.system_prompt.clone(),
                tools.clone(),
                request_options.clone(),
            )
        })
        .await
    }

    /// Send the conversation in JSON mode and parse the reply into a
    /// [`StructuredSummary`]. Parse failure is fatal to this generation
    /// call and is not retried here; the remote call itself already went
    /// through the retry wrapper.
    pub async fn call_structured(
        &self,
        system_prompt: impl Into<String>,
    ) -> LlmResult<StructuredSummary> {
        let response = self.call(&CallOptions::json(system_prompt)).await?;
        let text = response.content.unwrap_or_default();
        StructuredSummary::from_llm_text(&text).map_err(|e| LlmError::MalformedResponse {
            message: e.to_string(),
        })
    }

    /// Append a user turn.
    pub fn append_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    /// Append an assistant turn, optionally carrying tool invocations.
    pub fn append_assistant(&mut self, text: Option<String>, tool_calls: &[ToolCall]) {
        if tool_calls.is_empty() {
            self.messages
                .push(Message::assistant(text.unwrap_or_default()));
        } else {
            self.messages
                .push(Message::assistant_with_tools(text, tool_calls));
        }
    }

    /// Append a tool turn answering `tool_use_id`.
    ///
    /// The id must be an unanswered invocation from the most recent
    /// assistant turn; anything else is a protocol violation by the caller.
    pub fn append_tool_result(
        &mut self,
        tool_use_id: &str,
        content: impl Into<String>,
        is_error: bool,
    ) -> LlmResult<()> {
        if !self.pending_tool_ids().iter().any(|id| id == tool_use_id) {
            return Err(LlmError::InvalidRequest {
                message: format!(
                    "tool result {} does not answer a pending invocation",
                    tool_use_id
                ),
            });
        }
        self.messages
            .push(Message::tool_result(tool_use_id, content, is_error));
        Ok(())
    }

    /// Unanswered tool invocation ids from the most recent assistant turn.
    pub fn pending_tool_ids(&self) -> Vec<String> {
        let Some(last_assistant) = self
            .messages
            .iter()
            .rposition(|m| m.role == MessageRole::Assistant)
        else {
            return Vec::new();
        };

        let mut pending: Vec<String> = self.messages[last_assistant]
            .tool_use_ids()
            .into_iter()
            .map(String::from)
            .collect();

        for msg in &self.messages[last_assistant + 1..] {
            for content in &msg.content {
                if let MessageContent::ToolResult { tool_use_id, .. } = content {
                    pending.retain(|id| id != tool_use_id);
                }
            }
        }
        pending
    }

    /// Read-only view of the transcript, for logging and tests.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Clear the conversation. Used between independent chunks or phases.
    pub fn reset(&mut self) {
        self.messages.clear();
    }
}
