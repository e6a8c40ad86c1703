//! Tool Definitions
//!
//! Provides the tool schema exposed to the model.

use std::collections::HashMap;

use repo_pulse_llm::types::{ParameterSchema, ToolDefinition};

/// Name of the single tool offered to the model.
pub const FETCH_DETAILS_TOOL: &str = "fetch_commit_details";

/// Upper bound on commit hashes per invocation.
pub const MAX_IDS_PER_CALL: usize = 10;

/// Get all available tool definitions
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![fetch_details_tool()]
}

/// Commit detail tool definition
pub fn fetch_details_tool() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "commit_ids".to_string(),
        ParameterSchema::array(
            Some("Full commit hashes to fetch detail for, at most 10 per call"),
            ParameterSchema::string(Some("A full commit hash")),
        )
        .with_max_items(MAX_IDS_PER_CALL),
    );

    ToolDefinition {
        name: FETCH_DETAILS_TOOL.to_string(),
        description: "Fetch extended detail for a batch of commits: per-file \
            status, additions, deletions, and patch text plus aggregate line \
            counts. Use this when a commit message alone is not enough to \
            judge what changed."
            .to_string(),
        input_schema: ParameterSchema::object(
            Some("Fetch commit detail parameters"),
            properties,
            vec!["commit_ids".to_string()],
        ),
    }
}
