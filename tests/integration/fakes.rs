//! Test Fakes
//!
//! A scripted provider that replays canned responses while recording every
//! request, and a recording detail fetcher. Together they make generation
//! runs fully deterministic.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use repo_pulse::services::summary::SummaryEngine;
use repo_pulse_core::change::{ChangeAuthor, ChangeDetail, ChangeRecord};
use repo_pulse_core::summary::{DigestWindow, SummaryConfiguration};
use repo_pulse_llm::provider::LlmProvider;
use repo_pulse_llm::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig, StopReason,
    ToolCall, ToolDefinition, UsageStats,
};
use repo_pulse_tools::fetcher::{DetailFetcher, FetchError, FetchResult};

/// One request observed by the scripted provider.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub system: Option<String>,
    pub tools_offered: bool,
    pub json_mode: bool,
}

/// Provider that pops one canned response per call and records requests.
pub struct ScriptedProvider {
    config: ProviderConfig,
    script: Mutex<VecDeque<LlmResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<LlmResponse>) -> Self {
        Self {
            config: ProviderConfig::default(),
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
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
        self.calls.lock().unwrap().push(RecordedCall {
            messages,
            system,
            tools_offered: !tools.is_empty(),
            json_mode: options.json_mode,
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(LlmError::Other {
                message: "script exhausted".to_string(),
            })
    }
}

/// Fetcher that records every requested batch.
pub struct RecordingFetcher {
    calls: Mutex<Vec<Vec<String>>>,
    fail: bool,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DetailFetcher for RecordingFetcher {
    async fn fetch_details(&self, shas: &[String]) -> FetchResult<Vec<Option<ChangeDetail>>> {
        self.calls.lock().unwrap().push(shas.to_vec());
        if self.fail {
            return Err(FetchError::Network("connection refused".to_string()));
        }
        Ok(shas
            .iter()
            .map(|sha| {
                Some(ChangeDetail {
                    sha: sha.clone(),
                    files: vec![],
                    additions: 3,
                    deletions: 1,
                })
            })
            .collect())
    }
}

/// Build an engine over a scripted provider and recording fetcher.
pub fn engine_with(
    script: Vec<LlmResponse>,
    fetcher: RecordingFetcher,
    config: SummaryConfiguration,
) -> (SummaryEngine, Arc<ScriptedProvider>, Arc<RecordingFetcher>) {
    let provider = Arc::new(ScriptedProvider::new(script));
    let fetcher = Arc::new(fetcher);
    let engine = SummaryEngine::new(provider.clone(), fetcher.clone(), config);
    (engine, provider, fetcher)
}

/// `n` records with distinct full-length hashes.
pub fn records(n: usize) -> Vec<ChangeRecord> {
    (0..n)
        .map(|i| {
            let author = ChangeAuthor {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                timestamp: chrono::DateTime::from_timestamp(1_748_700_000 + i as i64, 0).unwrap(),
            };
            ChangeRecord {
                sha: format!("{:040x}", i + 1),
                author: author.clone(),
                committer: author,
                message: format!("subsystem: change number {}\n\nbody", i),
                files: vec![format!("src/mod{}.rs", i % 7)],
                parents: vec![],
                tree: None,
            }
        })
        .collect()
}

pub fn window(total: usize) -> DigestWindow {
    DigestWindow {
        date_label: "2025-06-01".to_string(),
        branch: "master".to_string(),
        total_count: total,
        relevant_count: total,
        first_sha: None,
        last_sha: None,
    }
}

/// Plain-text assistant response.
pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        content: Some(text.to_string()),
        thinking: None,
        tool_calls: vec![],
        stop_reason: StopReason::EndTurn,
        usage: UsageStats::default(),
        model: "scripted-1".to_string(),
    }
}

/// Assistant response with no text at all.
pub fn empty_response() -> LlmResponse {
    LlmResponse {
        content: None,
        thinking: None,
        tool_calls: vec![],
        stop_reason: StopReason::EndTurn,
        usage: UsageStats::default(),
        model: "scripted-1".to_string(),
    }
}

/// Assistant response requesting detail for `shas` in one invocation.
pub fn tool_response(id: &str, shas: &[&str]) -> LlmResponse {
    LlmResponse {
        content: Some("Let me look closer.".to_string()),
        thinking: None,
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            name: "fetch_commit_details".to_string(),
            arguments: serde_json::json!({ "commit_ids": shas }),
        }],
        stop_reason: StopReason::ToolUse,
        usage: UsageStats::default(),
        model: "scripted-1".to_string(),
    }
}

/// A valid structured-summary JSON body citing `commits`.
pub fn summary_json(commits: &[&str]) -> String {
    serde_json::json!({
        "title": "Daily digest",
        "overview": "Overview of the day.",
        "categories": [{
            "title": "Changes",
            "points": [{
                "text": "Work landed across the tree",
                "commits": commits,
                "breaking": false
            }]
        }]
    })
    .to_string()
}

/// Text of the first content block of a message, empty when none.
pub fn first_text(message: &Message) -> String {
    use repo_pulse_llm::types::MessageContent;
    message
        .content
        .iter()
        .find_map(|c| match c {
            MessageContent::Text { text } => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_default()
}
