//! Summary Engine
//!
//! The orchestration strategy driving a generation run: decide chunking,
//! run the per-chunk investigation loop against the model, synthesize
//! across chunks, and close with one JSON-mode call that yields the
//! structured digest. Chunks are processed sequentially on purpose; the
//! remote model's rate budget is shared, and the cross-chunk synthesis
//! needs every chunk's output anyway.

use std::collections::HashSet;
use std::sync::Arc;

use repo_pulse_core::change::ChangeRecord;
use repo_pulse_core::summary::{
    DailyDigest, DigestWindow, StrategyKind, StructuredSummary, SummaryConfiguration, WeekWindow,
};
use repo_pulse_llm::provider::{create_provider, LlmProvider};
use repo_pulse_llm::session::{CallOptions, ProviderSession};
use repo_pulse_llm::types::{LlmResult, ProviderConfig, ProviderType};
use repo_pulse_tools::definitions::tool_definitions;
use repo_pulse_tools::executor::ToolExecutor;
use repo_pulse_tools::fetcher::DetailFetcher;

use super::phased;
use super::prompts;

/// Batches larger than this are split into chunks.
pub const CHUNK_THRESHOLD: usize = 300;

/// Records per chunk once splitting kicks in.
pub const CHUNK_SIZE: usize = 250;

/// Investigation-loop cap for a single-chunk run.
pub const MAX_ITERATIONS: usize = 10;

/// Tighter per-chunk cap once the batch is split.
pub const CHUNKED_MAX_ITERATIONS: usize = 5;

/// Generates daily and weekly digests from change records.
///
/// The provider and detail fetcher are injected once at construction; the
/// engine owns their lifecycle for the duration of a run and creates a
/// fresh conversation per generation call.
pub struct SummaryEngine {
    provider: Arc<dyn LlmProvider>,
    tools: ToolExecutor,
    config: SummaryConfiguration,
}

impl SummaryEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        fetcher: Arc<dyn DetailFetcher>,
        config: SummaryConfiguration,
    ) -> Self {
        Self {
            provider,
            tools: ToolExecutor::new(fetcher),
            config,
        }
    }

    /// Build the engine from provider configuration, honoring the
    /// `llm_provider` override. An unknown provider name fails here, before
    /// any remote call is made.
    pub fn from_provider_config(
        mut provider_config: ProviderConfig,
        fetcher: Arc<dyn DetailFetcher>,
        config: SummaryConfiguration,
    ) -> LlmResult<Self> {
        if let Some(name) = &config.llm_provider {
            provider_config.provider = name.parse::<ProviderType>()?;
        }
        Ok(Self::new(create_provider(provider_config), fetcher, config))
    }

    /// Generate the digest for one day of change records.
    pub async fn generate_summary(
        &self,
        records: &[ChangeRecord],
        window: &DigestWindow,
    ) -> LlmResult<StructuredSummary> {
        let mut session = self.new_session();
        match self.config.strategy {
            StrategyKind::Agentic => self.run_agentic(&mut session, records, window).await,
            StrategyKind::Phased => phased::run(self, &mut session, records, window).await,
        }
    }

    /// Generate the weekly digest from prior daily digests.
    ///
    /// A single JSON-mode call: the dailies already carry their citations,
    /// and per-commit detail adds nothing at week scale.
    pub async fn generate_weekly_summary(
        &self,
        dailies: &[DailyDigest],
        week: &WeekWindow,
    ) -> LlmResult<StructuredSummary> {
        let mut session = self.new_session();
        session.append_user(prompts::weekly_rollup_prompt(dailies, week, &self.config));
        session
            .call_structured(format!(
                "You are an engineering analyst rolling daily digests of the \
                 {} to {} week into one weekly digest.",
                week.start_date, week.end_date
            ))
            .await
    }

    async fn run_agentic(
        &self,
        session: &mut ProviderSession,
        records: &[ChangeRecord],
        window: &DigestWindow,
    ) -> LlmResult<StructuredSummary> {
        let chunks = chunk_records(records);
        let multi_chunk = chunks.len() > 1;
        let cap = if multi_chunk {
            CHUNKED_MAX_ITERATIONS
        } else {
            MAX_ITERATIONS
        };
        let system = prompts::system_prompt(window);

        let mut chunk_summaries = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            tracing::debug!(
                chunk = index + 1,
                chunks = chunks.len(),
                records = chunk.len(),
                "investigating chunk"
            );
            let initial =
                prompts::investigation_prompt(chunk, &self.config, window, index, chunks.len());
            let summary = self
                .tool_loop(session, initial, &system, cap, window)
                .await?;
            chunk_summaries.push(summary);
        }

        if multi_chunk {
            session.reset();
            session.append_user(prompts::synthesis_prompt(&chunk_summaries, window));
            let response = session.call(&CallOptions::plain(system.clone())).await?;
            session.append_assistant(response.content, &[]);
        }

        session.append_user(prompts::final_json_prompt(&self.config, window));
        session.call_structured(system).await
    }

    /// Run one agentic investigation conversation to completion.
    ///
    /// Resets the session, appends `initial` as the opening user turn, and
    /// loops calls with tools enabled. A response without tool invocations
    /// ends the loop naturally; hitting the cap degrades to one fallback
    /// call with tools disabled. Either way the outcome is appended as an
    /// assistant turn so later prompts can build on it.
    pub(crate) async fn tool_loop(
        &self,
        session: &mut ProviderSession,
        initial: String,
        system: &str,
        cap: usize,
        window: &DigestWindow,
    ) -> LlmResult<String> {
        session.reset();
        session.append_user(initial);

        for _ in 0..cap {
            let response = session.call(&CallOptions::with_tools(system)).await?;

            if !response.has_tool_calls() {
                let text = response.content.unwrap_or_default();
                session.append_assistant(Some(text.clone()), &[]);
                return Ok(text);
            }

            session.append_assistant(response.content.clone(), &response.tool_calls);
            for (tool_use_id, result) in self.tools.execute_all(&response.tool_calls).await {
                session.append_tool_result(&tool_use_id, result.to_content(), !result.success)?;
            }
        }

        // Degraded path: the conversation did not converge within the cap.
        tracing::warn!(cap, "investigation iteration cap reached, using fallback summary");
        session.append_user(prompts::exhausted_fallback_prompt());
        let response = session.call(&CallOptions::plain(system)).await?;
        let text = response
            .content
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| prompts::placeholder_summary(window));
        session.append_assistant(Some(text.clone()), &[]);
        Ok(text)
    }

    pub(crate) fn config(&self) -> &SummaryConfiguration {
        &self.config
    }

    fn new_session(&self) -> ProviderSession {
        ProviderSession::new(self.provider.clone(), tool_definitions())
    }
}

/// Split a batch into order-preserving chunks.
///
/// Batches at or under [`CHUNK_THRESHOLD`] stay whole; larger batches are
/// cut into [`CHUNK_SIZE`] slices, the last of which may be smaller.
pub fn chunk_records(records: &[ChangeRecord]) -> Vec<&[ChangeRecord]> {
    if records.len() > CHUNK_THRESHOLD {
        records.chunks(CHUNK_SIZE).collect()
    } else {
        vec![records]
    }
}

/// Check that every commit cited by `summary` belongs to the input batch.
///
/// The engine itself never validates citations; harnesses and callers that
/// care use this. Returns the unknown hashes on failure.
pub fn verify_citations(
    summary: &StructuredSummary,
    records: &[ChangeRecord],
) -> Result<(), Vec<String>> {
    let known: HashSet<&str> = records.iter().map(|r| r.sha.as_str()).collect();
    let unknown: Vec<String> = summary
        .cited_shas()
        .into_iter()
        .filter(|sha| !known.contains(sha))
        .map(String::from)
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo_pulse_core::change::ChangeAuthor;
    use repo_pulse_core::summary::{Category, Point};

    fn record(n: usize) -> ChangeRecord {
        let author = ChangeAuthor {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            timestamp: chrono::DateTime::from_timestamp(0, 0).unwrap(),
        };
        ChangeRecord {
            sha: format!("{:040x}", n + 1),
            author: author.clone(),
            committer: author,
            message: format!("commit {}", n),
            files: vec![],
            parents: vec![],
            tree: None,
        }
    }

    fn records(n: usize) -> Vec<ChangeRecord> {
        (0..n).map(record).collect()
    }

    #[test]
    fn test_small_batch_is_one_chunk() {
        let batch = records(CHUNK_THRESHOLD);
        let chunks = chunk_records(&batch);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), CHUNK_THRESHOLD);
    }

    #[test]
    fn test_large_batch_chunking_preserves_order() {
        let batch = records(520);
        let chunks = chunk_records(&batch);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 250);
        assert_eq!(chunks[1].len(), 250);
        assert_eq!(chunks[2].len(), 20);
        assert_eq!(chunks[0][0].sha, batch[0].sha);
        assert_eq!(chunks[1][0].sha, batch[250].sha);
        assert_eq!(chunks[2][19].sha, batch[519].sha);
    }

    #[test]
    fn test_chunk_count_matches_ceiling_division() {
        for size in [301, 500, 501, 750, 1000] {
            let batch = records(size);
            let chunks = chunk_records(&batch);
            assert_eq!(chunks.len(), size.div_ceil(CHUNK_SIZE), "size {}", size);
            let total: usize = chunks.iter().map(|c| c.len()).sum();
            assert_eq!(total, size);
        }
    }

    #[test]
    fn test_verify_citations() {
        let batch = records(3);
        let summary = StructuredSummary {
            title: "t".to_string(),
            overview: "o".to_string(),
            categories: vec![Category {
                title: "c".to_string(),
                points: vec![Point {
                    text: "p".to_string(),
                    commits: vec![batch[0].sha.clone(), batch[2].sha.clone()],
                    breaking: false,
                }],
            }],
        };
        assert!(verify_citations(&summary, &batch).is_ok());

        let mut hallucinated = summary.clone();
        hallucinated.categories[0].points[0]
            .commits
            .push("d".repeat(40));
        let unknown = verify_citations(&hallucinated, &batch).unwrap_err();
        assert_eq!(unknown, vec!["d".repeat(40)]);
    }
}
