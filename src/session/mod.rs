mod evaluate;
mod record;
mod state;

pub use evaluate::{AttendanceReport, StudentResult, Verdict, attendance_rate, evaluate};
pub use record::{CheckIndex, CheckRecord, CheckStatus, Mark, SessionData, Student, StudentId};
pub use state::{AttendanceSession, CheckOutcome, CheckPhase, CompletedSession};
