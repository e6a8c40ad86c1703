//! Phased breaking-change pipeline tests.

use repo_pulse_core::summary::{StrategyKind, SummaryConfiguration};

use super::fakes::*;

fn phased_config() -> SummaryConfiguration {
    SummaryConfiguration {
        strategy: StrategyKind::Phased,
        ..Default::default()
    }
}

#[tokio::test]
async fn five_phases_then_final_json() {
    let batch = records(5);
    let candidate = batch[2].sha.clone();
    let (engine, provider, _fetcher) = engine_with(
        vec![
            // Phase 1: candidate detection names one hash
            text_response(&format!("Possible breakage:\n- {} drops an ioctl", candidate)),
            // Phase 2: verification
            text_response(&format!("{} confirmed: removes a user-visible ioctl", candidate)),
            // Phase 3: context gathering converges without tool calls
            text_response("Callers in tools/ were migrated last week."),
            // Phase 4: recount
            text_response(&format!("{}: userspace must switch to the new ioctl", candidate)),
            // Phase 5: prose synthesis
            text_response("A focused day with one confirmed breaking change."),
            // Shared final JSON step
            text_response(&summary_json(&[&candidate])),
        ],
        RecordingFetcher::new(),
        phased_config(),
    );

    let summary = engine.generate_summary(&batch, &window(5)).await.unwrap();
    assert_eq!(summary.title, "Daily digest");

    let calls = provider.calls();
    assert_eq!(calls.len(), 6);

    // Tools are offered only in the candidate and context-gathering phases.
    let tools: Vec<bool> = calls.iter().map(|c| c.tools_offered).collect();
    assert_eq!(tools, vec![true, false, true, false, false, false]);
    assert!(calls[5].json_mode, "final JSON call comes last");

    // The verify phase re-embeds the extracted candidate.
    let verify_prompt = first_text(&calls[1].messages[0]);
    assert!(verify_prompt.contains(&candidate));
    assert!(verify_prompt.contains("Re-examine"));

    // The prose phase carries the recount forward.
    let prose_prompt = first_text(&calls[4].messages[0]);
    assert!(prose_prompt.contains("userspace must switch"));
}

#[tokio::test]
async fn no_candidates_skips_straight_to_prose() {
    let batch = records(5);
    let (engine, provider, _fetcher) = engine_with(
        vec![
            text_response("Nothing qualifies as a breaking change today."),
            text_response("An unremarkable day of fixes."),
            text_response(&summary_json(&[&batch[0].sha])),
        ],
        RecordingFetcher::new(),
        phased_config(),
    );

    engine.generate_summary(&batch, &window(5)).await.unwrap();

    let calls = provider.calls();
    assert_eq!(calls.len(), 3, "verify/context/recount are skipped");
    let prose_prompt = first_text(&calls[1].messages[0]);
    assert!(prose_prompt.contains("No breaking changes were identified"));
    assert!(calls[2].json_mode);
}

#[tokio::test]
async fn candidate_phase_may_use_tools() {
    let batch = records(5);
    let candidate = batch[0].sha.clone();
    let (engine, provider, fetcher) = engine_with(
        vec![
            tool_response("call_1", &[&candidate]),
            text_response("Nothing qualifies after inspection."),
            text_response("Routine fixes only."),
            text_response(&summary_json(&[&candidate])),
        ],
        RecordingFetcher::new(),
        phased_config(),
    );

    engine.generate_summary(&batch, &window(5)).await.unwrap();

    assert_eq!(provider.calls().len(), 4);
    assert_eq!(fetcher.calls(), vec![vec![candidate]]);
}
