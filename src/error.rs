use thiserror::Error;

use crate::session::{CheckIndex, StudentId};

/// Misuse of the session contract. None of these are retryable: each one
/// rejects the call and leaves the session exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot start a session with an empty roster")]
    InvalidRoster,

    #[error("student {0} appears more than once in the roster")]
    DuplicateStudent(StudentId),

    #[error("check {active} is still running; finish it before starting check {requested}")]
    CheckAlreadyActive {
        active: CheckIndex,
        requested: CheckIndex,
    },

    #[error("check {requested} is locked until check {required} is finished")]
    CheckOrderViolation {
        requested: CheckIndex,
        required: CheckIndex,
    },

    #[error("check {0} is already finished and cannot be reopened")]
    CheckAlreadyCompleted(CheckIndex),

    #[error("check {0} is not the active check")]
    CheckNotActive(CheckIndex),

    #[error("unknown student: {0}")]
    UnknownStudent(StudentId),

    #[error("session is incomplete: {completed} of 3 checks finished")]
    SessionIncomplete { completed: u8 },

    #[error("session record is inconsistent: {0}")]
    CorruptSession(String),
}

/// Failures while building a roster from an external source.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("student name must not be blank")]
    BlankName,

    #[error("no student matching '{0}' on the roster")]
    NotOnRoster(String),

    #[error("CSV file appears to be empty or missing headers")]
    EmptyCsv,

    #[error("could not find a 'Name' column; the first row needs a header like 'Student Name'")]
    MissingNameColumn,

    #[error("failed to fetch sheet (status {status})")]
    Fetch { status: u16 },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures delivering a finished report to the webhook.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no webhook URL configured")]
    NotConfigured,

    #[error("webhook rejected the report (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum RollcallError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_messages_name_the_checks() {
        let err = SessionError::CheckAlreadyActive {
            active: CheckIndex::One,
            requested: CheckIndex::Two,
        };
        assert_eq!(
            err.to_string(),
            "check 1 is still running; finish it before starting check 2"
        );

        let err = SessionError::CheckOrderViolation {
            requested: CheckIndex::Three,
            required: CheckIndex::Two,
        };
        assert_eq!(err.to_string(), "check 3 is locked until check 2 is finished");
    }

    #[test]
    fn session_error_converts_into_top_level() {
        let err: RollcallError = SessionError::SessionIncomplete { completed: 2 }.into();
        assert_eq!(
            err.to_string(),
            "Session error: session is incomplete: 2 of 3 checks finished"
        );
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SessionError>();
        assert_send_sync::<RollcallError>();
    }
}
