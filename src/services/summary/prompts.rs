//! Prompt Builders
//!
//! Pure functions rendering generation state into model input. No I/O, no
//! shared state; the same inputs always produce the same text. Every
//! builder that renders a record batch embeds every commit hash verbatim,
//! so the model can always cite them back.

use repo_pulse_core::change::ChangeRecord;
use repo_pulse_core::summary::{DailyDigest, DigestWindow, SummaryConfiguration, WeekWindow};

/// File paths shown per commit before eliding the rest.
const MAX_FILES_SHOWN: usize = 8;

/// Applied when the configuration does not override the criteria.
const DEFAULT_BREAKING_CRITERIA: &str = "\
A change is breaking when it removes or renames a public interface, changes \
an on-disk or wire format incompatibly, changes a default that existing \
setups rely on, or requires action from users when upgrading.";

/// System directive shared by every call in a generation run.
pub fn system_prompt(window: &DigestWindow) -> String {
    format!(
        "You are an engineering analyst writing the {date} activity digest \
         for the {branch} branch of a large open-source repository. You read \
         commit batches, investigate the interesting ones through the \
         available tool, and produce precise, citation-backed summaries. \
         Always refer to commits by their full hash.",
        date = window.date_label,
        branch = window.branch,
    )
}

/// Initial investigation prompt for one chunk of the day's records.
pub fn investigation_prompt(
    records: &[ChangeRecord],
    config: &SummaryConfiguration,
    window: &DigestWindow,
    chunk_index: usize,
    chunk_count: usize,
) -> String {
    format!(
        "{scope}\n\n\
         {overview}\n\n\
         ## Commits\n{commits}\n\n\
         {bias}\
         ## Task\n\
         Group these commits into themes, identify the notable work, and \
         flag anything that looks like a breaking change. Use the \
         fetch_commit_details tool (at most 10 hashes per call) when a \
         message alone is not enough to judge a commit. When you are done \
         investigating, reply with your findings as plain text and no \
         further tool calls.",
        scope = chunk_scope_line(chunk_index, chunk_count),
        overview = overview_lines(window),
        commits = render_records(records),
        bias = bias_text(config),
    )
}

/// Prompt issued once the investigation iteration cap is reached.
pub fn exhausted_fallback_prompt() -> String {
    "Stop investigating now. Summarize what you have learned so far about \
     these commits as plain text. Do not request any more tool calls."
        .to_string()
}

/// Minimal chunk summary used when the model returns nothing at the cap.
pub fn placeholder_summary(window: &DigestWindow) -> String {
    format!(
        "{} commits landed on {} ({} relevant after filtering). No further \
         detail could be gathered for this batch.",
        window.total_count, window.date_label, window.relevant_count
    )
}

/// Cross-chunk synthesis prompt over the per-chunk summaries.
pub fn synthesis_prompt(chunk_summaries: &[String], window: &DigestWindow) -> String {
    let sections = chunk_summaries
        .iter()
        .enumerate()
        .map(|(i, summary)| format!("### Batch {} of {}\n{}", i + 1, chunk_summaries.len(), summary))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "The day's commits were analyzed in {count} batches. Combine the \
         batch findings below into one coherent account of the day. Keep \
         every commit citation intact.\n\n\
         {overview}\n\n\
         {sections}",
        count = chunk_summaries.len(),
        overview = overview_lines(window),
        sections = sections,
    )
}

/// Final prompt requesting the structured JSON digest.
pub fn final_json_prompt(config: &SummaryConfiguration, window: &DigestWindow) -> String {
    format!(
        "Now produce the digest for {date} as a single JSON object and \
         nothing else, using exactly this shape:\n\n\
         {{\n  \"title\": \"short digest title\",\n  \"overview\": \"one-paragraph overview of the day\",\n  \"categories\": [\n    {{\n      \"title\": \"category name\",\n      \"points\": [\n        {{\"text\": \"what changed and why it matters\", \"commits\": [\"full hash\", \"...\"], \"breaking\": false}}\n      ]\n    }}\n  ]\n}}\n\n\
         Every point must cite at least one commit hash from the analyzed \
         set, and only hashes from that set. Set \"breaking\": true only \
         where these criteria apply:\n{criteria}",
        date = window.date_label,
        criteria = config
            .breaking_change_criteria
            .as_deref()
            .unwrap_or(DEFAULT_BREAKING_CRITERIA),
    )
}

/// Weekly rollup prompt over prior daily digests.
pub fn weekly_rollup_prompt(
    dailies: &[DailyDigest],
    week: &WeekWindow,
    config: &SummaryConfiguration,
) -> String {
    let days = dailies
        .iter()
        .map(|d| {
            let json = serde_json::to_string_pretty(&d.summary)
                .unwrap_or_else(|_| "{}".to_string());
            format!("### {}\n{}", d.date_label, json)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Below are the daily digests for week {week} of {year} ({start} to \
         {end}). Synthesize them into one weekly digest as a single JSON \
         object with the same shape as the dailies: a title, an overview \
         paragraph, and categories of points citing commit hashes. Carry \
         citations through from the dailies; do not invent hashes. Preserve \
         any breaking-change flags that still matter at week scale.\n\n\
         {bias}{days}",
        week = week.week_number,
        year = week.year,
        start = week.start_date,
        end = week.end_date,
        bias = bias_text(config),
        days = days,
    )
}

// ── Phased breaking-change pipeline ────────────────────────────────────

/// Phase 1: find breaking-change candidates, tools available.
pub fn phase_candidates_prompt(
    records: &[ChangeRecord],
    config: &SummaryConfiguration,
    window: &DigestWindow,
    chunk_index: usize,
    chunk_count: usize,
) -> String {
    format!(
        "{scope}\n\n\
         {overview}\n\n\
         ## Commits\n{commits}\n\n\
         {bias}\
         ## Task\n\
         Identify commits that might be breaking changes under these \
         criteria:\n{criteria}\n\n\
         Use the fetch_commit_details tool (at most 10 hashes per call) \
         where a message is ambiguous. Finish by listing the full hash of \
         every candidate, one per line, with a one-line reason each. If \
         nothing qualifies, say so explicitly.",
        scope = chunk_scope_line(chunk_index, chunk_count),
        overview = overview_lines(window),
        commits = render_records(records),
        bias = bias_text(config),
        criteria = config
            .breaking_change_criteria
            .as_deref()
            .unwrap_or(DEFAULT_BREAKING_CRITERIA),
    )
}

/// Phase 2: verify candidates against stricter criteria, no tools.
pub fn phase_verify_prompt(candidates: &[String], findings: &str) -> String {
    format!(
        "These commits were flagged as possible breaking changes:\n{list}\n\n\
         Earlier findings:\n{findings}\n\n\
         Re-examine each candidate strictly. Keep only commits where the \
         evidence clearly shows user-visible breakage; drop anything \
         speculative. Answer with the surviving hashes and, for each, what \
         breaks and for whom.",
        list = candidates
            .iter()
            .map(|sha| format!("- {}", sha))
            .collect::<Vec<_>>()
            .join("\n"),
        findings = findings,
    )
}

/// Phase 3: open-ended context gathering, tools available.
pub fn phase_context_prompt(verified: &str) -> String {
    format!(
        "Current verification state:\n{verified}\n\n\
         Gather whatever additional context would firm up or overturn these \
         conclusions, using the fetch_commit_details tool where useful (at \
         most 10 hashes per call). When you have enough context, reply with \
         what you learned as plain text and no further tool calls.",
        verified = verified,
    )
}

/// Phase 4: detailed recount of the confirmed breaking changes, no tools.
pub fn phase_recount_prompt(candidates: &[String], context: &str) -> String {
    format!(
        "Candidates under review:\n{list}\n\n\
         Gathered context:\n{context}\n\n\
         Give the final account of each confirmed breaking change: what \
         changed, who is affected, and what action upgrading users must \
         take. Cite the commit hash for each. State plainly which \
         candidates were cleared.",
        list = candidates
            .iter()
            .map(|sha| format!("- {}", sha))
            .collect::<Vec<_>>()
            .join("\n"),
        context = context,
    )
}

/// Phase 5: final prose synthesis for the chunk, no tools.
pub fn phase_prose_prompt(
    records: &[ChangeRecord],
    window: &DigestWindow,
    breaking_account: Option<&str>,
) -> String {
    let breaking_section = match breaking_account {
        Some(account) => format!(
            "## Breaking-change findings\n{}\n\n",
            account
        ),
        None => "No breaking changes were identified in this batch.\n\n".to_string(),
    };

    format!(
        "{overview}\n\n\
         ## Commits\n{commits}\n\n\
         {breaking}\
         Write the narrative summary of this batch: group the work into \
         themes, call out the notable commits by full hash, and weave in \
         the breaking-change findings above where they apply.",
        overview = overview_lines(window),
        commits = render_records(records),
        breaking = breaking_section,
    )
}

// ── Shared rendering helpers ───────────────────────────────────────────

fn chunk_scope_line(chunk_index: usize, chunk_count: usize) -> String {
    if chunk_count > 1 {
        format!(
            "You are looking at batch {} of {} from one day of commit activity.",
            chunk_index + 1,
            chunk_count
        )
    } else {
        "You are looking at one day of commit activity.".to_string()
    }
}

fn overview_lines(window: &DigestWindow) -> String {
    let mut lines = format!(
        "Date: {}\nBranch: {}\nCommits that day: {} total, {} after bot filtering.",
        window.date_label, window.branch, window.total_count, window.relevant_count
    );
    if let (Some(first), Some(last)) = (&window.first_sha, &window.last_sha) {
        lines.push_str(&format!("\nFirst commit: {}\nLast commit: {}", first, last));
    }
    lines
}

fn render_records(records: &[ChangeRecord]) -> String {
    records
        .iter()
        .map(render_record)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_record(record: &ChangeRecord) -> String {
    let files = if record.files.len() > MAX_FILES_SHOWN {
        format!(
            "{} (+{} more)",
            record.files[..MAX_FILES_SHOWN].join(", "),
            record.files.len() - MAX_FILES_SHOWN
        )
    } else {
        record.files.join(", ")
    };

    if files.is_empty() {
        format!("- {} {}", record.sha, record.title())
    } else {
        format!("- {} {} [files: {}]", record.sha, record.title(), files)
    }
}

fn bias_text(config: &SummaryConfiguration) -> String {
    let mut sections = Vec::new();

    if let Some(instructions) = config
        .custom_instructions
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        sections.push(format!("Additional instructions: {}", instructions));
    }

    let keywords = config.keyword_list();
    if !keywords.is_empty() {
        sections.push(format!(
            "Pay particular attention to commits touching: {}.",
            keywords.join(", ")
        ));
    }

    if !config.focus_areas.is_empty() {
        sections.push(format!(
            "Emphasize these subsystems, in order: {}.",
            config.focus_areas.join(", ")
        ));
    }

    if !config.ignored_bot_emails.is_empty() {
        sections.push(format!(
            "Commits from these senders were already filtered out upstream: {}.",
            config.ignored_bot_emails.join(", ")
        ));
    }

    if sections.is_empty() {
        String::new()
    } else {
        format!("## Guidance\n{}\n\n", sections.join("\n"))
    }
}
