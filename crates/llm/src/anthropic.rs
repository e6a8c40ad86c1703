//! Anthropic Claude Provider
//!
//! Implementation of the LlmProvider trait for Anthropic's Claude API, the
//! backend with native tool-use content blocks.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::http_client::build_http_client;
use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ProviderConfig, StopReason, ToolCall, ToolDefinition, UsageStats,
};

/// Default Anthropic API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Current API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(Duration::from_secs(config.request_timeout_secs));
        Self { config, client }
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL)
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
        });

        // Add system prompt as structured block with cache_control hint
        if let Some(sys) = system {
            body["system"] = serde_json::json!([{
                "type": "text",
                "text": sys,
                "cache_control": { "type": "ephemeral" }
            }]);
        }

        let claude_messages: Vec<serde_json::Value> =
            messages.iter().map(|m| self.message_to_claude(m)).collect();
        body["messages"] = serde_json::json!(claude_messages);

        // Add tools if provided, with cache_control on the last tool
        if !tools.is_empty() {
            let tool_count = tools.len();
            let claude_tools: Vec<serde_json::Value> = tools
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let mut tool = serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.input_schema
                    });
                    if i == tool_count - 1 {
                        tool["cache_control"] = serde_json::json!({ "type": "ephemeral" });
                    }
                    tool
                })
                .collect();
            body["tools"] = serde_json::json!(claude_tools);
        }

        body
    }

    /// Convert a Message to Claude API format
    fn message_to_claude(&self, message: &Message) -> serde_json::Value {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };

        let content: Vec<serde_json::Value> = message
            .content
            .iter()
            .map(|c| match c {
                MessageContent::Text { text } => {
                    serde_json::json!({
                        "type": "text",
                        "text": text
                    })
                }
                MessageContent::ToolUse { id, name, input } => {
                    serde_json::json!({
                        "type": "tool_use",
                        "id": id,
                        "name": name,
                        "input": input
                    })
                }
                MessageContent::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => {
                    let mut result = serde_json::json!({
                        "type": "tool_result",
                        "tool_use_id": tool_use_id,
                        "content": content
                    });
                    if let Some(true) = is_error {
                        result["is_error"] = serde_json::json!(true);
                    }
                    result
                }
            })
            .collect();

        serde_json::json!({
            "role": role,
            "content": content
        })
    }

    /// Parse a response from Claude API
    fn parse_response(&self, response: &ClaudeResponse) -> LlmResponse {
        let mut content = None;
        let mut tool_calls = Vec::new();

        for block in &response.content {
            match block {
                ContentBlock::Text { text } => {
                    content = Some(text.clone());
                }
                ContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        arguments: input.clone(),
                    });
                }
                ContentBlock::Other => {}
            }
        }

        let stop_reason = response
            .stop_reason
            .as_deref()
            .map(StopReason::from)
            .unwrap_or(StopReason::EndTurn);

        LlmResponse {
            content,
            thinking: None,
            tool_calls,
            stop_reason,
            usage: UsageStats {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
                thinking_tokens: None,
            },
            model: response.model.clone(),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
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
            .ok_or_else(|| missing_api_key_error("anthropic"))?;

        // No native JSON mode on this API; json_mode relies on the prompt
        // demanding a bare JSON object.
        let body = self.build_request_body(&messages, system.as_deref(), &tools, &options);

        let response = self
            .client
            .post(self.base_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, "anthropic"));
        }

        let claude_response: ClaudeResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(self.parse_response(&claude_response))
    }
}

/// Claude API response format
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    model: String,
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: ResponseUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    input_tokens: u32,
    output_tokens: u32,
}
