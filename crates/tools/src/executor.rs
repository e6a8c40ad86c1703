//! Tool Executor
//!
//! Interprets tool invocations emitted by the model and turns each into a
//! formatted text block for the next conversation turn. Execution problems
//! of any kind (unknown tool, bad arguments, fetch failures) are reported
//! back to the model as error text; they never abort the generation loop.

use std::sync::Arc;

use serde::Deserialize;

use repo_pulse_llm::types::ToolCall;

use super::definitions::{FETCH_DETAILS_TOOL, MAX_IDS_PER_CALL};
use super::fetcher::DetailFetcher;

/// Result of a tool execution
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Output from the tool (if successful)
    pub output: Option<String>,
    /// Error message (if failed)
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    /// Create an error result
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Convert to string for model consumption
    pub fn to_content(&self) -> String {
        if self.success {
            self.output.clone().unwrap_or_default()
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or("Unknown error"))
        }
    }
}

/// Arguments for the commit detail tool.
#[derive(Debug, Deserialize)]
struct FetchDetailsArgs {
    commit_ids: Vec<String>,
}

/// Executes tool invocations against the detail fetcher.
pub struct ToolExecutor {
    fetcher: Arc<dyn DetailFetcher>,
}

impl ToolExecutor {
    pub fn new(fetcher: Arc<dyn DetailFetcher>) -> Self {
        Self { fetcher }
    }

    /// Execute one invocation, producing the text block that answers it.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        if call.name != FETCH_DETAILS_TOOL {
            return ToolResult::err(format!("unknown tool: {}", call.name));
        }

        let args: FetchDetailsArgs = match serde_json::from_value(call.arguments.clone()) {
            Ok(args) => args,
            Err(e) => {
                return ToolResult::err(format!("invalid arguments for {}: {}", call.name, e));
            }
        };

        if args.commit_ids.is_empty() {
            return ToolResult::err("commit_ids must not be empty");
        }

        let mut ids = args.commit_ids;
        if ids.len() > MAX_IDS_PER_CALL {
            tracing::warn!(
                requested = ids.len(),
                limit = MAX_IDS_PER_CALL,
                "truncating oversized detail request"
            );
            ids.truncate(MAX_IDS_PER_CALL);
        }

        match self.fetcher.fetch_details(&ids).await {
            Ok(details) => {
                let found: Vec<_> = details.iter().flatten().collect();
                let missing: Vec<&str> = ids
                    .iter()
                    .zip(&details)
                    .filter(|(_, d)| d.is_none())
                    .map(|(sha, _)| sha.as_str())
                    .collect();

                let mut output = match serde_json::to_string_pretty(&found) {
                    Ok(json) => json,
                    Err(e) => return ToolResult::err(format!("failed to serialize detail: {}", e)),
                };
                if !missing.is_empty() {
                    output.push_str("\n\nNo detail available for: ");
                    output.push_str(&missing.join(", "));
                }
                ToolResult::ok(output)
            }
            Err(e) => ToolResult::err(format!("detail fetch failed: {}", e)),
        }
    }

    /// Execute an ordered list of invocations, one result per invocation.
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<(String, ToolResult)> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self.execute(call).await;
            results.push((call.id.clone(), result));
        }
        results
    }
}
