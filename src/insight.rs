//! Free-text helpers backed by the text service.
//!
//! [`extract_names`] turns pasted text into roster names and
//! [`summarize_session`] writes a short paragraph about a finished report.
//! Both degrade gracefully: a failed call never blocks the instructor.

use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::assistant::{AssistantError, MessageSender, MessagesRequest};
use crate::roster::split_lines;
use crate::session::{AttendanceReport, CheckIndex};

pub const SUMMARY_FALLBACK: &str = "Unable to generate AI summary at this time.";
pub const SUMMARY_EMPTY: &str = "Summary could not be generated.";

const EXTRACT_SYSTEM: &str = "You extract student names from arbitrary text. \
     Respond with ONLY a JSON array of strings, no other text.";

const SUMMARY_SYSTEM: &str = "You are a strict but fair school administrator.";

/// Ask the service for the names in `text`. Fails on any transport or
/// format problem; see [`extract_names`] for the forgiving variant.
pub async fn try_extract_names(
    client: &impl MessageSender,
    text: &str,
) -> Result<Vec<String>, AssistantError> {
    let req = MessagesRequest::single(
        client.model(),
        1024,
        format!("Extract a list of student names from the following text.\n\nText:\n{text}"),
    )
    .with_system(EXTRACT_SYSTEM);

    let response = client.send_message(&req).await?;
    let body = response.first_text().ok_or(AssistantError::EmptyResponse)?;
    let names: Vec<String> = serde_json::from_str(strip_code_fence(body))
        .map_err(|e| AssistantError::Parse(format!("expected a JSON array of names: {e}")))?;

    Ok(names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect())
}

/// Names found in `text`. Falls back to one name per line when the
/// service is unavailable or answers with something unusable.
pub async fn extract_names(client: &impl MessageSender, text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    match try_extract_names(client, text).await {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "name extraction failed, splitting on lines");
            split_lines(text)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryInput<'a> {
    date: String,
    total_students: usize,
    final_attendance_count: usize,
    absent_student_names: Vec<&'a str>,
    details: Vec<serde_json::Value>,
}

/// One paragraph about the session, or a fixed fallback sentence.
pub async fn summarize_session(client: &impl MessageSender, report: &AttendanceReport) -> String {
    let input = SummaryInput {
        date: report.started_at.to_rfc3339(),
        total_students: report.roster_size(),
        final_attendance_count: report.total_present,
        absent_student_names: report.absent_names().collect(),
        details: report
            .students
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "checks": {
                        "check1": s.checks.get(CheckIndex::One),
                        "check2": s.checks.get(CheckIndex::Two),
                        "check3": s.checks.get(CheckIndex::Three),
                    }
                })
            })
            .collect(),
    };
    let data = match serde_json::to_string(&input) {
        Ok(data) => data,
        Err(e) => {
            warn!(error = %e, "could not encode summary input");
            return SUMMARY_FALLBACK.to_string();
        }
    };

    let req = MessagesRequest::single(
        client.model(),
        512,
        format!(
            "Write a brief, 1-paragraph summary of today's class attendance based on the \
             following JSON data. Highlight who was absent and the overall attendance rate. \
             The rule is: a student is considered present only if they attended at least 2 \
             out of the 3 random checks.\n\nData:\n{data}"
        ),
    )
    .with_system(SUMMARY_SYSTEM);

    match client.send_message(&req).await {
        Ok(response) => response
            .first_text()
            .map(str::to_string)
            .unwrap_or_else(|| SUMMARY_EMPTY.to_string()),
        Err(e) => {
            warn!(error = %e, "summary generation failed");
            SUMMARY_FALLBACK.to_string()
        }
    }
}

/// Models sometimes wrap JSON in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
