//! OpenAI Provider
//!
//! Implementation of the LlmProvider trait for OpenAI-style chat-completions
//! endpoints. Requests always stream; the SSE response is reconstructed into
//! one complete `LlmResponse` through the index-keyed stream adapter, so
//! callers never see partial output.

use async_trait::async_trait;
use std::time::Duration;

use super::http_client::build_http_client;
use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::streaming_adapters::OpenAIStreamAdapter;
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ProviderConfig, StopReason, ToolCall, ToolDefinition, UsageStats,
};
use repo_pulse_core::streaming::{StreamAdapter, UnifiedStreamEvent};

/// Default OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI provider
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(Duration::from_secs(config.request_timeout_secs));
        Self { config, client }
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        tools: &[ToolDefinition],
        options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": options
                .temperature_override
                .unwrap_or(self.config.temperature),
            "stream": true,
            "stream_options": { "include_usage": true },
        });

        let mut openai_messages: Vec<serde_json::Value> = Vec::new();

        if let Some(sys) = system {
            openai_messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }

        for msg in messages {
            openai_messages.extend(self.message_to_openai(msg));
        }
        body["messages"] = serde_json::json!(openai_messages);

        if !tools.is_empty() {
            let openai_tools: Vec<serde_json::Value> = tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema
                        }
                    })
                })
                .collect();
            body["tools"] = serde_json::json!(openai_tools);
        }

        if options.json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        body
    }

    /// Convert a Message to OpenAI API format.
    ///
    /// Tool results become separate `role: tool` messages on this wire, so
    /// one logical message may expand to several wire messages.
    fn message_to_openai(&self, message: &Message) -> Vec<serde_json::Value> {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };

        let has_tool_results = message
            .content
            .iter()
            .any(|c| matches!(c, MessageContent::ToolResult { .. }));

        if has_tool_results {
            return message
                .content
                .iter()
                .filter_map(|c| {
                    if let MessageContent::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } = c
                    {
                        Some(serde_json::json!({
                            "role": "tool",
                            "tool_call_id": tool_use_id,
                            "content": content
                        }))
                    } else {
                        None
                    }
                })
                .collect();
        }

        let has_tool_calls = message
            .content
            .iter()
            .any(|c| matches!(c, MessageContent::ToolUse { .. }));

        let text_content: String = message
            .content
            .iter()
            .filter_map(|c| {
                if let MessageContent::Text { text } = c {
                    Some(text.as_str())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        if has_tool_calls {
            let tool_calls: Vec<serde_json::Value> = message
                .content
                .iter()
                .filter_map(|c| {
                    if let MessageContent::ToolUse { id, name, input } = c {
                        Some(serde_json::json!({
                            "id": id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": input.to_string()
                            }
                        }))
                    } else {
                        None
                    }
                })
                .collect();

            let mut msg = serde_json::json!({
                "role": role,
                "tool_calls": tool_calls
            });

            // Always include content; some OpenAI-compatible APIs require
            // it even when the assistant only emits tool calls.
            if text_content.is_empty() {
                msg["content"] = serde_json::Value::Null;
            } else {
                msg["content"] = serde_json::json!(text_content);
            }

            return vec![msg];
        }

        vec![serde_json::json!({
            "role": role,
            "content": text_content
        })]
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        let body = self.build_request_body(&messages, system.as_deref(), &tools, &options);

        let response = self
            .client
            .post(self.base_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;
            return Err(parse_http_error(status, &body_text, "openai"));
        }

        // Reconstruct the SSE stream into one complete response.
        let mut adapter = OpenAIStreamAdapter::new(&self.config.model);
        let mut accumulated_content = String::new();
        let mut accumulated_thinking = String::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut usage = UsageStats::default();
        let mut stop_reason = StopReason::EndTurn;

        let mut stream = response.bytes_stream();
        use futures_util::StreamExt;

        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(line_end) = buffer.find('\n') {
                let line = buffer[..line_end].to_string();
                buffer = buffer[line_end + 1..].to_string();

                if line.trim().is_empty() {
                    continue;
                }

                let events = adapter.adapt(&line).map_err(|e| LlmError::ParseError {
                    message: e.to_string(),
                })?;

                for event in events {
                    match event {
                        UnifiedStreamEvent::TextDelta { content } => {
                            accumulated_content.push_str(&content);
                        }
                        UnifiedStreamEvent::ThinkingDelta { content } => {
                            accumulated_thinking.push_str(&content);
                        }
                        UnifiedStreamEvent::ToolComplete {
                            tool_id,
                            tool_name,
                            arguments,
                        } => {
                            if let Ok(input) = serde_json::from_str(&arguments) {
                                tool_calls.push(ToolCall {
                                    id: tool_id,
                                    name: tool_name,
                                    arguments: input,
                                });
                            } else {
                                tracing::warn!(
                                    tool_id = %tool_id,
                                    "discarding tool call with unparseable arguments"
                                );
                            }
                        }
                        UnifiedStreamEvent::Usage {
                            input_tokens,
                            output_tokens,
                            thinking_tokens,
                        } => {
                            usage.input_tokens = input_tokens;
                            usage.output_tokens = output_tokens;
                            usage.thinking_tokens = thinking_tokens;
                        }
                        UnifiedStreamEvent::Complete {
                            stop_reason: Some(reason),
                        } => {
                            stop_reason = StopReason::from(reason.as_str());
                        }
                        UnifiedStreamEvent::Error { message, .. } => {
                            return Err(LlmError::ServerError {
                                message,
                                status: None,
                            });
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(LlmResponse {
            content: if accumulated_content.is_empty() {
                None
            } else {
                Some(accumulated_content)
            },
            thinking: if accumulated_thinking.is_empty() {
                None
            } else {
                Some(accumulated_thinking)
            },
            tool_calls,
            stop_reason,
            usage,
            model: self.config.model.clone(),
        })
    }
}
