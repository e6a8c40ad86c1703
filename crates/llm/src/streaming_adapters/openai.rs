//! OpenAI Chat-Completions SSE Stream Adapter
//!
//! Handles the OpenAI-compatible SSE delta format. Tool calls arrive as
//! partial fragments spread across many chunks; each fragment carries a
//! stable `index`, and id/name/arguments dribble in separately. Fragments
//! are accumulated per index and merged into `ToolComplete` events only
//! when the stream reaches a terminal signal, so partial tool calls never
//! escape this adapter.

use repo_pulse_core::streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Internal event types from the OpenAI-compatible SSE format
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    /// Some compatible endpoints report failures as a terminal chunk
    /// carrying an error object instead of closing the connection.
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallFragment>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallFragment {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionFragment>,
}

#[derive(Debug, Deserialize)]
struct FunctionFragment {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    #[serde(default)]
    reasoning_tokens: Option<u32>,
}

/// One tool call being reassembled from stream fragments.
#[derive(Debug, Default)]
struct PendingToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
    started: bool,
}

/// Adapter for the OpenAI-compatible chat-completions SSE format
pub struct OpenAIStreamAdapter {
    model: String,
    /// Track if we're in a reasoning block
    in_reasoning: bool,
    /// Tool calls being accumulated, keyed by the stream's stable index
    pending: BTreeMap<usize, PendingToolCall>,
}

impl OpenAIStreamAdapter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            in_reasoning: false,
            pending: BTreeMap::new(),
        }
    }

    /// Flush all pending tool calls in index order, emitting ToolComplete
    /// events for those with a known id and name.
    fn flush_pending_tools(&mut self) -> Vec<UnifiedStreamEvent> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_values()
            .filter_map(|p| match (p.id, p.name) {
                (Some(id), Some(name)) => Some(UnifiedStreamEvent::ToolComplete {
                    tool_id: id,
                    tool_name: name,
                    arguments: p.arguments,
                }),
                _ => None,
            })
            .collect()
    }
}

impl StreamAdapter for OpenAIStreamAdapter {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn supports_thinking(&self) -> bool {
        // reasoning_content appears on OpenAI-compatible endpoints serving
        // reasoning models; pass it through when present.
        let model = self.model.to_lowercase();
        model.starts_with("o1") || model.starts_with("o3") || model.contains("reason")
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError> {
        let trimmed = input.trim();

        // Handle SSE format: "data: {...}"
        // SSE streams may include event:, id:, retry:, and comment lines.
        let json_str = if let Some(rest) = trimmed.strip_prefix("data: ") {
            rest
        } else if trimmed.starts_with('{') {
            trimmed
        } else {
            return Ok(vec![]);
        };

        if json_str.is_empty() || json_str == "[DONE]" {
            let mut events = self.flush_pending_tools();
            if self.in_reasoning {
                self.in_reasoning = false;
                events.push(UnifiedStreamEvent::ThinkingEnd);
            }
            return Ok(events);
        }

        let chunk: ChatCompletionChunk =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let mut events = vec![];

        if let Some(error) = chunk.error {
            // Codes are strings on most endpoints, numbers on a few.
            events.push(UnifiedStreamEvent::Error {
                message: error.message,
                code: error.code.map(|c| match c {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                }),
            });
            return Ok(events);
        }

        if let Some(usage) = chunk.usage {
            events.push(UnifiedStreamEvent::Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                thinking_tokens: usage.reasoning_tokens,
            });
        }

        for choice in chunk.choices {
            if let Some(delta) = choice.delta {
                if let Some(reasoning) = delta.reasoning_content {
                    if !reasoning.is_empty() {
                        if !self.in_reasoning {
                            self.in_reasoning = true;
                            events.push(UnifiedStreamEvent::ThinkingStart);
                        }
                        events.push(UnifiedStreamEvent::ThinkingDelta { content: reasoning });
                    }
                }

                if let Some(content) = delta.content {
                    if !content.is_empty() {
                        if self.in_reasoning {
                            self.in_reasoning = false;
                            events.push(UnifiedStreamEvent::ThinkingEnd);
                        }
                        events.push(UnifiedStreamEvent::TextDelta { content });
                    }
                }

                if let Some(fragments) = delta.tool_calls {
                    for fragment in fragments {
                        let entry = self
                            .pending
                            .entry(fragment.index.unwrap_or(0))
                            .or_default();
                        if let Some(id) = fragment.id.filter(|i| !i.is_empty()) {
                            entry.id = Some(id);
                        }
                        if let Some(func) = fragment.function {
                            if let Some(name) = func.name.filter(|n| !n.is_empty()) {
                                entry.name = Some(name);
                            }
                            if let Some(args) = func.arguments {
                                entry.arguments.push_str(&args);
                            }
                        }
                        if !entry.started {
                            if let (Some(id), Some(name)) = (&entry.id, &entry.name) {
                                entry.started = true;
                                events.push(UnifiedStreamEvent::ToolStart {
                                    tool_id: id.clone(),
                                    tool_name: name.clone(),
                                });
                            }
                        }
                    }
                }
            }

            if let Some(finish_reason) = choice.finish_reason {
                events.extend(self.flush_pending_tools());
                if self.in_reasoning {
                    self.in_reasoning = false;
                    events.push(UnifiedStreamEvent::ThinkingEnd);
                }
                events.push(UnifiedStreamEvent::Complete {
                    stop_reason: Some(finish_reason),
                });
            }
        }

        Ok(events)
    }

    fn reset(&mut self) {
        self.in_reasoning = false;
        self.pending.clear();
    }
}
