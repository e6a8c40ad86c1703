//! Daily generation flow tests: chunking behavior, tool rounds, the
//! iteration-cap fallback, and failure semantics, all against a scripted
//! provider.

use repo_pulse::services::summary::engine::{verify_citations, CHUNK_SIZE};
use repo_pulse::services::summary::SummaryEngine;
use repo_pulse_core::summary::SummaryConfiguration;
use repo_pulse_llm::types::{LlmError, LlmResponse, MessageContent};

use super::fakes::*;

#[tokio::test]
async fn single_chunk_skips_synthesis() {
    let batch = records(10);
    let (engine, provider, fetcher) = engine_with(
        vec![
            text_response("Findings: routine maintenance day."),
            text_response(&summary_json(&[&batch[0].sha])),
        ],
        RecordingFetcher::new(),
        SummaryConfiguration::default(),
    );

    let summary = engine.generate_summary(&batch, &window(10)).await.unwrap();
    assert_eq!(summary.title, "Daily digest");

    let calls = provider.calls();
    assert_eq!(calls.len(), 2, "one investigation call, one JSON call");
    assert!(calls[0].tools_offered);
    assert!(!calls[0].json_mode);
    assert!(!calls[1].tools_offered);
    assert!(calls[1].json_mode);
    assert!(fetcher.calls().is_empty());

    // The JSON call sees the investigation findings in-conversation.
    let transcript: Vec<String> = calls[1].messages.iter().map(first_text).collect();
    assert!(transcript.iter().any(|t| t.contains("routine maintenance")));
}

#[tokio::test]
async fn tool_round_executes_requested_ids_once() {
    let batch = records(10);
    let requested: Vec<&str> = vec![&batch[1].sha, &batch[4].sha, &batch[7].sha];
    let (engine, provider, fetcher) = engine_with(
        vec![
            tool_response("call_1", &requested),
            text_response("Findings after detail."),
            text_response(&summary_json(&[&batch[1].sha])),
        ],
        RecordingFetcher::new(),
        SummaryConfiguration::default(),
    );

    engine.generate_summary(&batch, &window(10)).await.unwrap();

    let calls = provider.calls();
    assert_eq!(calls.len(), 3);
    let non_json = calls.iter().filter(|c| !c.json_mode).count();
    let json = calls.iter().filter(|c| c.json_mode).count();
    assert_eq!(non_json, 2, "exactly two non-JSON calls");
    assert_eq!(json, 1, "exactly one JSON call");

    let fetches = fetcher.calls();
    assert_eq!(fetches.len(), 1, "tool executor invoked exactly once");
    assert_eq!(fetches[0], requested);

    // The second call sees the tool turn answering call_1.
    let has_tool_turn = calls[1].messages.iter().any(|m| {
        m.content.iter().any(|c| {
            matches!(c, MessageContent::ToolResult { tool_use_id, is_error, .. }
                if tool_use_id == "call_1" && is_error.is_none())
        })
    });
    assert!(has_tool_turn);
}

#[tokio::test]
async fn large_batch_chunks_in_order_with_one_synthesis_call() {
    let batch = records(520);
    let (engine, provider, _fetcher) = engine_with(
        vec![
            text_response("Batch one findings."),
            text_response("Batch two findings."),
            text_response("Batch three findings."),
            text_response("Combined account of the day."),
            text_response(&summary_json(&[&batch[0].sha])),
        ],
        RecordingFetcher::new(),
        SummaryConfiguration::default(),
    );

    engine.generate_summary(&batch, &window(520)).await.unwrap();

    let calls = provider.calls();
    assert_eq!(calls.len(), 5, "three chunks, one synthesis, one JSON");

    // Chunk prompts carry exactly their own slice, in original order.
    let chunk_prompt = |i: usize| first_text(&calls[i].messages[0]);
    assert!(chunk_prompt(0).contains(&batch[0].sha));
    assert!(chunk_prompt(0).contains(&batch[CHUNK_SIZE - 1].sha));
    assert!(!chunk_prompt(0).contains(&batch[CHUNK_SIZE].sha));
    assert!(chunk_prompt(1).contains(&batch[CHUNK_SIZE].sha));
    assert!(!chunk_prompt(1).contains(&batch[2 * CHUNK_SIZE].sha));
    assert!(chunk_prompt(2).contains(&batch[519].sha));

    for i in 0..3 {
        assert!(calls[i].tools_offered, "chunk call {} offers tools", i);
    }

    // The synthesis call embeds all chunk findings in chunk order and
    // issues no tools.
    let synthesis = chunk_prompt(3);
    assert!(!calls[3].tools_offered);
    assert!(!calls[3].json_mode);
    let one = synthesis.find("Batch one findings").unwrap();
    let two = synthesis.find("Batch two findings").unwrap();
    let three = synthesis.find("Batch three findings").unwrap();
    assert!(one < two && two < three);

    assert!(calls[4].json_mode, "final JSON call comes last");
}

#[tokio::test]
async fn iteration_cap_degrades_to_fallback() {
    let batch = records(10);
    let sha = batch[0].sha.clone();
    // Ten tool rounds exhaust the cap, then one fallback and one JSON call.
    let mut script: Vec<LlmResponse> = (0..10)
        .map(|i| tool_response(&format!("call_{}", i), &[&sha]))
        .collect();
    script.push(text_response("Partial picture from ten rounds."));
    script.push(text_response(&summary_json(&[&sha])));

    let (engine, provider, fetcher) = engine_with(
        script,
        RecordingFetcher::new(),
        SummaryConfiguration::default(),
    );

    let summary = engine.generate_summary(&batch, &window(10)).await.unwrap();
    assert_eq!(summary.title, "Daily digest");

    let calls = provider.calls();
    assert_eq!(calls.len(), 12);
    assert_eq!(
        calls.iter().filter(|c| c.tools_offered).count(),
        10,
        "the loop never exceeds the cap"
    );
    assert!(!calls[10].tools_offered, "fallback call disables tools");
    assert!(first_text(&calls[10].messages[calls[10].messages.len() - 1])
        .contains("Stop investigating"));
    assert_eq!(fetcher.calls().len(), 10);
}

#[tokio::test]
async fn cap_fallback_with_empty_reply_still_yields_text() {
    let batch = records(10);
    let sha = batch[0].sha.clone();
    let mut script: Vec<LlmResponse> = (0..10)
        .map(|i| tool_response(&format!("call_{}", i), &[&sha]))
        .collect();
    script.push(empty_response());
    script.push(text_response(&summary_json(&[&sha])));

    let (engine, provider, _fetcher) = engine_with(
        script,
        RecordingFetcher::new(),
        SummaryConfiguration::default(),
    );

    engine.generate_summary(&batch, &window(10)).await.unwrap();

    // The placeholder stands in for the empty fallback reply, so the JSON
    // call still has a non-empty chunk summary to work from.
    let calls = provider.calls();
    let transcript: Vec<String> = calls[11].messages.iter().map(first_text).collect();
    assert!(transcript
        .iter()
        .any(|t| t.contains("No further detail could be gathered")));
}

#[tokio::test]
async fn failed_tool_fetch_surfaces_as_error_turn_and_loop_continues() {
    let batch = records(10);
    let (engine, provider, _fetcher) = engine_with(
        vec![
            tool_response("call_1", &[&batch[0].sha]),
            text_response("Findings despite the failure."),
            text_response(&summary_json(&[&batch[0].sha])),
        ],
        RecordingFetcher::failing(),
        SummaryConfiguration::default(),
    );

    let summary = engine.generate_summary(&batch, &window(10)).await.unwrap();
    assert_eq!(summary.title, "Daily digest");

    let calls = provider.calls();
    assert_eq!(calls.len(), 3, "the loop continued past the failure");
    let error_turn = calls[1].messages.iter().find_map(|m| {
        m.content.iter().find_map(|c| match c {
            MessageContent::ToolResult {
                tool_use_id,
                content,
                is_error,
            } if tool_use_id == "call_1" => Some((content.clone(), *is_error)),
            _ => None,
        })
    });
    let (content, is_error) = error_turn.expect("tool turn present");
    assert_eq!(is_error, Some(true));
    assert!(content.starts_with("Error:"));
}

#[tokio::test]
async fn malformed_json_reply_is_fatal() {
    let batch = records(5);
    let (engine, _provider, _fetcher) = engine_with(
        vec![text_response("Findings."), text_response("not json")],
        RecordingFetcher::new(),
        SummaryConfiguration::default(),
    );

    let err = engine
        .generate_summary(&batch, &window(5))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse { .. }));
}

#[tokio::test]
async fn citation_harness_flags_fabricated_hashes() {
    let batch = records(5);
    let fabricated = "f".repeat(40);
    let (engine, _provider, _fetcher) = engine_with(
        vec![
            text_response("Findings."),
            text_response(&summary_json(&[&batch[0].sha, &fabricated])),
        ],
        RecordingFetcher::new(),
        SummaryConfiguration::default(),
    );

    // The engine itself does not validate citations.
    let summary = engine.generate_summary(&batch, &window(5)).await.unwrap();

    let unknown = verify_citations(&summary, &batch).unwrap_err();
    assert_eq!(unknown, vec![fabricated]);

    let clean = engine_with(
        vec![
            text_response("Findings."),
            text_response(&summary_json(&[&batch[0].sha])),
        ],
        RecordingFetcher::new(),
        SummaryConfiguration::default(),
    );
    let summary = clean.0.generate_summary(&batch, &window(5)).await.unwrap();
    assert!(verify_citations(&summary, &batch).is_ok());
}

#[tokio::test]
async fn provider_failure_propagates() {
    let batch = records(3);
    let (engine, _provider, _fetcher) = engine_with(
        vec![],
        RecordingFetcher::new(),
        SummaryConfiguration::default(),
    );
    let err = engine
        .generate_summary(&batch, &window(3))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Other { .. }));
}

#[test]
fn unknown_provider_name_fails_at_construction() {
    use std::sync::Arc;

    let config = SummaryConfiguration {
        llm_provider: Some("gemini".to_string()),
        ..Default::default()
    };
    let err = SummaryEngine::from_provider_config(
        Default::default(),
        Arc::new(RecordingFetcher::new()),
        config,
    )
    .err()
    .expect("unknown provider must be rejected");
    assert!(matches!(err, LlmError::InvalidRequest { .. }));
}
