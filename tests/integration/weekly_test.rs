//! Weekly rollup flow tests.

use repo_pulse_core::summary::{DailyDigest, StructuredSummary, SummaryConfiguration, WeekWindow};
use repo_pulse_llm::types::LlmError;

use super::fakes::*;

fn week() -> WeekWindow {
    WeekWindow {
        start_date: "2025-06-02".to_string(),
        end_date: "2025-06-08".to_string(),
        year: 2025,
        week_number: 23,
    }
}

fn dailies() -> Vec<DailyDigest> {
    ["Monday surge", "Tuesday cleanup"]
        .iter()
        .enumerate()
        .map(|(i, title)| DailyDigest {
            date_label: format!("2025-06-0{}", i + 2),
            summary: StructuredSummary {
                title: title.to_string(),
                overview: "Day overview.".to_string(),
                categories: vec![],
            },
        })
        .collect()
}

#[tokio::test]
async fn weekly_rollup_is_one_json_call() {
    let (engine, provider, fetcher) = engine_with(
        vec![text_response(&summary_json(&["a1b2"]))],
        RecordingFetcher::new(),
        SummaryConfiguration::default(),
    );

    let summary = engine
        .generate_weekly_summary(&dailies(), &week())
        .await
        .unwrap();
    assert_eq!(summary.title, "Daily digest");

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].json_mode);
    assert!(!calls[0].tools_offered);
    assert!(fetcher.calls().is_empty());

    let prompt = first_text(&calls[0].messages[0]);
    assert!(prompt.contains("Monday surge"));
    assert!(prompt.contains("Tuesday cleanup"));
    assert!(prompt.contains("week 23"));
}

#[tokio::test]
async fn weekly_malformed_reply_is_fatal() {
    let (engine, _provider, _fetcher) = engine_with(
        vec![text_response("not json")],
        RecordingFetcher::new(),
        SummaryConfiguration::default(),
    );
    let err = engine
        .generate_weekly_summary(&dailies(), &week())
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse { .. }));
}
