use std::fmt;

use tracing::{debug, info};

use super::evaluate::{self, AttendanceReport};
use super::record::{CheckIndex, CheckStatus, Mark, SessionData, Student, StudentId};
use crate::error::SessionError;

/// Where a single check stands in the session lifecycle.
///
/// Check 1 begins `Ready`, checks 2 and 3 begin `Locked`. A check moves
/// `Ready -> Active -> Completed`, and finishing check N unlocks N+1.
/// `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckPhase {
    Locked,
    Ready,
    Active,
    Completed,
}

impl fmt::Display for CheckPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckPhase::Locked => write!(f, "LOCKED"),
            CheckPhase::Ready => write!(f, "READY"),
            CheckPhase::Active => write!(f, "ACTIVE"),
            CheckPhase::Completed => write!(f, "DONE"),
        }
    }
}

/// The result of finishing a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub check: CheckIndex,
    /// Students still pending when the check closed, now absent.
    pub forced_absent: usize,
    /// The check that became `Ready`, if any.
    pub unlocked: Option<CheckIndex>,
}

/// A live session: the replayable [`SessionData`] plus the transient
/// pointer to the running check.
///
/// The active pointer is deliberately not part of `SessionData`. A session
/// rebuilt with [`AttendanceSession::resume`] never has a running check;
/// an interrupted round comes back `Ready` with its marks intact.
#[derive(Debug, Clone)]
pub struct AttendanceSession {
    data: SessionData,
    active: Option<CheckIndex>,
}

impl AttendanceSession {
    /// Open a session for every student on the roster.
    pub fn start(roster: &[Student]) -> Result<Self, SessionError> {
        let data = SessionData::initialize(roster.iter().map(|s| &s.id))?;
        info!(
            session_id = %data.session_id,
            students = data.student_count(),
            "session started"
        );
        Ok(Self { data, active: None })
    }

    /// Rebuild a session from a stored record. No check is active afterwards.
    pub fn resume(data: SessionData) -> Result<Self, SessionError> {
        data.validate()?;
        debug!(
            session_id = %data.session_id,
            completed = data.completed_checks(),
            "session resumed"
        );
        Ok(Self { data, active: None })
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn active_check(&self) -> Option<CheckIndex> {
        self.active
    }

    pub fn completed_checks(&self) -> u8 {
        self.data.completed_checks()
    }

    pub fn is_complete(&self) -> bool {
        self.data.completed_checks() == 3
    }

    pub fn phase(&self, check: CheckIndex) -> CheckPhase {
        let completed = self.data.completed_checks();
        if self.active == Some(check) {
            CheckPhase::Active
        } else if completed >= check.number() {
            CheckPhase::Completed
        } else if completed == check.number() - 1 {
            CheckPhase::Ready
        } else {
            CheckPhase::Locked
        }
    }

    /// The check that can be started next, if no check is running.
    pub fn next_check(&self) -> Option<CheckIndex> {
        CheckIndex::ALL
            .into_iter()
            .find(|c| self.phase(*c) == CheckPhase::Ready)
            .filter(|_| self.active.is_none())
    }

    /// Begin check `check`. Only one check may run at a time, and checks
    /// run strictly in order.
    pub fn start_check(&mut self, check: CheckIndex) -> Result<(), SessionError> {
        if let Some(active) = self.active {
            return Err(SessionError::CheckAlreadyActive {
                active,
                requested: check,
            });
        }
        match self.phase(check) {
            CheckPhase::Ready => {
                self.active = Some(check);
                debug!(check = check.number(), "check started");
                Ok(())
            }
            CheckPhase::Completed => Err(SessionError::CheckAlreadyCompleted(check)),
            CheckPhase::Locked | CheckPhase::Active => Err(SessionError::CheckOrderViolation {
                requested: check,
                // Locked implies a predecessor exists.
                required: check.previous().unwrap_or(check),
            }),
        }
    }

    pub fn set_status(
        &mut self,
        student_id: &StudentId,
        check: CheckIndex,
        mark: Mark,
    ) -> Result<(), SessionError> {
        self.ensure_active(check)?;
        self.data.set_status(student_id, check, mark)?;
        debug!(check = check.number(), student = %student_id, ?mark, "status set");
        Ok(())
    }

    /// Flip a student's status in the running check. Anything not present
    /// becomes present; present becomes absent.
    pub fn toggle(
        &mut self,
        student_id: &StudentId,
        check: CheckIndex,
    ) -> Result<CheckStatus, SessionError> {
        self.ensure_active(check)?;
        let mark = match self.data.read_record(student_id)?.get(check) {
            CheckStatus::Present => Mark::Absent,
            CheckStatus::Pending | CheckStatus::Absent => Mark::Present,
        };
        self.data.set_status(student_id, check, mark)?;
        Ok(mark.into())
    }

    pub fn set_all_for_check(&mut self, check: CheckIndex, mark: Mark) -> Result<(), SessionError> {
        self.ensure_active(check)?;
        self.data.set_all_for_check(check, mark);
        debug!(check = check.number(), ?mark, "all students marked");
        Ok(())
    }

    /// Close the running check. Students nobody marked are recorded absent.
    pub fn finish_check(&mut self, check: CheckIndex) -> Result<CheckOutcome, SessionError> {
        self.ensure_active(check)?;
        let forced_absent = self.data.commit(check);
        self.active = None;

        let unlocked = check.next();
        info!(
            check = check.number(),
            forced_absent,
            completed = self.data.completed_checks(),
            "check finished"
        );
        Ok(CheckOutcome {
            check,
            forced_absent,
            unlocked,
        })
    }

    /// Freeze the session for reporting. All three checks must be finished.
    pub fn finalize(&self) -> Result<CompletedSession, SessionError> {
        if !self.is_complete() {
            return Err(SessionError::SessionIncomplete {
                completed: self.data.completed_checks(),
            });
        }
        Ok(CompletedSession {
            data: self.data.clone(),
        })
    }

    fn ensure_active(&self, check: CheckIndex) -> Result<(), SessionError> {
        match self.active {
            Some(active) if active == check => Ok(()),
            _ => Err(SessionError::CheckNotActive(check)),
        }
    }
}

/// A read-only snapshot of a session with all three checks finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    data: SessionData,
}

impl CompletedSession {
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn evaluate(&self, roster: &[Student]) -> Result<AttendanceReport, SessionError> {
        evaluate::evaluate(&self.data, roster)
    }
}
