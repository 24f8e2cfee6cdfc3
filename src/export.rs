//! Delivery of a finished report to an external webhook.
//!
//! The payload shape is a compatibility contract with existing receivers:
//! camelCase keys, the rate as a percent string, lowercase check statuses.

use std::future::Future;
use std::time::Duration;

use chrono::SecondsFormat;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ExportError;
use crate::session::{AttendanceReport, CheckIndex, CheckStatus, Verdict};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub session_id: String,
    /// UTC, millisecond precision, `Z` suffix.
    pub date: String,
    pub total_students: usize,
    pub present_count: usize,
    pub absent_count: usize,
    /// e.g. `"67%"`.
    pub attendance_rate: String,
    pub per_student: Vec<StudentRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub name: String,
    pub status: Verdict,
    pub checks_present: u8,
    pub check1: CheckStatus,
    pub check2: CheckStatus,
    pub check3: CheckStatus,
}

impl ExportPayload {
    /// Flatten a report. Rows keep the report's absent-first order.
    pub fn from_report(report: &AttendanceReport) -> Self {
        Self {
            session_id: report.session_id.clone(),
            date: report.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            total_students: report.roster_size(),
            present_count: report.total_present,
            absent_count: report.total_absent,
            attendance_rate: format!("{}%", report.attendance_rate),
            per_student: report
                .students
                .iter()
                .map(|s| StudentRow {
                    name: s.name.clone(),
                    status: s.verdict,
                    checks_present: s.present_count,
                    check1: s.checks.get(CheckIndex::One),
                    check2: s.checks.get(CheckIndex::Two),
                    check3: s.checks.get(CheckIndex::Three),
                })
                .collect(),
        }
    }
}

/// Somewhere a finished report can be sent.
pub trait ReportSink {
    fn export(&self, payload: &ExportPayload)
    -> impl Future<Output = Result<(), ExportError>> + Send;
}

/// Posts the payload as JSON to a fixed URL.
pub struct WebhookExporter {
    client: Client,
    url: String,
}

impl WebhookExporter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ExportError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ExportError::NotConfigured);
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, url })
    }
}

impl ReportSink for WebhookExporter {
    async fn export(&self, payload: &ExportPayload) -> Result<(), ExportError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ExportError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        info!(
            session_id = %payload.session_id,
            students = payload.total_students,
            "report exported"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{AttendanceSession, Mark, Student};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn report() -> AttendanceReport {
        let roster = vec![Student::new("A"), Student::new("B")];
        let mut session = AttendanceSession::start(&roster).unwrap();

        session.start_check(CheckIndex::One).unwrap();
        session.set_status(&roster[0].id, CheckIndex::One, Mark::Present).unwrap();
        session.finish_check(CheckIndex::One).unwrap();

        session.start_check(CheckIndex::Two).unwrap();
        session.set_all_for_check(CheckIndex::Two, Mark::Present).unwrap();
        session.finish_check(CheckIndex::Two).unwrap();

        session.start_check(CheckIndex::Three).unwrap();
        session.finish_check(CheckIndex::Three).unwrap();

        session.finalize().unwrap().evaluate(&roster).unwrap()
    }

    #[test]
    fn payload_uses_contract_field_names() {
        let payload = ExportPayload::from_report(&report());
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["totalStudents"], 2);
        assert_eq!(json["presentCount"], 1);
        assert_eq!(json["absentCount"], 1);
        assert_eq!(json["attendanceRate"], "50%");
        assert!(json["sessionId"].is_string());

        let date = json["date"].as_str().unwrap();
        assert!(date.ends_with('Z'), "{date}");
        // yyyy-mm-ddThh:mm:ss.sssZ
        assert_eq!(date.len(), 24);
        assert_eq!(&date[19..20], ".");

        let first = &json["perStudent"][0];
        assert_eq!(first["name"], "B");
        assert_eq!(first["status"], "Absent");
        assert_eq!(first["checksPresent"], 1);
        assert_eq!(first["check1"], "absent");
        assert_eq!(first["check2"], "present");
        assert_eq!(first["check3"], "absent");
        assert_eq!(json["perStudent"][1]["status"], "Present");
    }

    #[test]
    fn blank_url_is_not_configured() {
        assert!(matches!(
            WebhookExporter::new("", Duration::from_secs(1)),
            Err(ExportError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn posts_payload_to_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({"attendanceRate": "50%"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let exporter =
            WebhookExporter::new(format!("{}/hook", server.uri()), Duration::from_secs(5)).unwrap();
        exporter
            .export(&ExportPayload::from_report(&report()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad payload"))
            .mount(&server)
            .await;

        let exporter = WebhookExporter::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = exporter
            .export(&ExportPayload::from_report(&report()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Rejected { status: 422, .. }));
    }
}
