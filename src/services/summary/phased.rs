//! Phased Breaking-Change Pipeline
//!
//! The more conservative strategy variant. Each chunk runs five sequential
//! phases: candidate detection (tools on), verification (tools off), a
//! context-gathering round (tools on), a detailed recount (tools off), and
//! a final prose synthesis (tools off). The session is reset between
//! phases; each phase prompt re-embeds whatever prior-phase output it
//! needs. Both strategies converge on the same final JSON call.

use std::sync::OnceLock;

use regex::Regex;

use repo_pulse_core::change::ChangeRecord;
use repo_pulse_core::summary::{DigestWindow, StructuredSummary};
use repo_pulse_llm::session::{CallOptions, ProviderSession};
use repo_pulse_llm::types::LlmResult;

use super::engine::{chunk_records, SummaryEngine, CHUNKED_MAX_ITERATIONS};
use super::prompts;

pub(crate) async fn run(
    engine: &SummaryEngine,
    session: &mut ProviderSession,
    records: &[ChangeRecord],
    window: &DigestWindow,
) -> LlmResult<StructuredSummary> {
    let chunks = chunk_records(records);
    let multi_chunk = chunks.len() > 1;
    let system = prompts::system_prompt(window);

    let mut chunk_summaries = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        let summary = run_chunk(
            engine,
            session,
            chunk,
            window,
            &system,
            index,
            chunks.len(),
        )
        .await?;
        chunk_summaries.push(summary);
    }

    if multi_chunk {
        session.reset();
        session.append_user(prompts::synthesis_prompt(&chunk_summaries, window));
        let response = session.call(&CallOptions::plain(system.clone())).await?;
        session.append_assistant(response.content, &[]);
    }

    session.append_user(prompts::final_json_prompt(engine.config(), window));
    session.call_structured(system).await
}

async fn run_chunk(
    engine: &SummaryEngine,
    session: &mut ProviderSession,
    chunk: &[ChangeRecord],
    window: &DigestWindow,
    system: &str,
    index: usize,
    chunk_count: usize,
) -> LlmResult<String> {
    // Phase 1: candidate detection with tools.
    let candidate_findings = engine
        .tool_loop(
            session,
            prompts::phase_candidates_prompt(chunk, engine.config(), window, index, chunk_count),
            system,
            CHUNKED_MAX_ITERATIONS,
            window,
        )
        .await?;

    let breaking_account = match extract_sha_candidates(&candidate_findings) {
        None => {
            tracing::debug!(chunk = index + 1, "no breaking-change candidates found");
            None
        }
        Some(candidates) => {
            // Phase 2: verification against stricter criteria, no tools.
            session.reset();
            session.append_user(prompts::phase_verify_prompt(&candidates, &candidate_findings));
            let verified = session.call(&CallOptions::plain(system)).await?;
            let verified_text = verified.content.unwrap_or_default();

            // Phase 3: open-ended context gathering with tools.
            let context = engine
                .tool_loop(
                    session,
                    prompts::phase_context_prompt(&verified_text),
                    system,
                    CHUNKED_MAX_ITERATIONS,
                    window,
                )
                .await?;

            // Phase 4: detailed recount, no tools.
            session.reset();
            session.append_user(prompts::phase_recount_prompt(&candidates, &context));
            let recount = session.call(&CallOptions::plain(system)).await?;
            recount.content.filter(|t| !t.trim().is_empty())
        }
    };

    // Phase 5: prose synthesis for the chunk, no tools.
    session.reset();
    session.append_user(prompts::phase_prose_prompt(
        chunk,
        window,
        breaking_account.as_deref(),
    ));
    let prose = session.call(&CallOptions::plain(system)).await?;
    let text = prose
        .content
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| prompts::placeholder_summary(window));
    session.append_assistant(Some(text.clone()), &[]);
    Ok(text)
}

/// Pull full-length commit hashes out of freeform model text.
///
/// Best-effort parse with an explicit none-found sentinel: `None` means the
/// text contained no hash-like token at all, which is a different statement
/// than "candidates were considered and rejected". Duplicates collapse to
/// the first occurrence, order preserved.
pub(crate) fn extract_sha_candidates(text: &str) -> Option<Vec<String>> {
    static SHA_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = SHA_PATTERN
        .get_or_init(|| Regex::new(r"\b[0-9a-f]{40}\b").expect("valid hash pattern"));

    let mut seen = Vec::new();
    for m in pattern.find_iter(text) {
        let sha = m.as_str().to_string();
        if !seen.contains(&sha) {
            seen.push(sha);
        }
    }
    if seen.is_empty() {
        None
    } else {
        Some(seen)
    }
}
