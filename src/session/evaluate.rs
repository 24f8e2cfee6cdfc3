use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{CheckRecord, SessionData, Student, StudentId};
use crate::error::SessionError;

/// Minimum number of present checks for a student to count as attending.
pub const PRESENT_THRESHOLD: u8 = 2;

/// Final classification of a student. `Absent` orders before `Present`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Absent,
    Present,
}

impl Verdict {
    pub fn from_present_count(present_count: u8) -> Self {
        if present_count >= PRESENT_THRESHOLD {
            Verdict::Present
        } else {
            Verdict::Absent
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Absent => write!(f, "Absent"),
            Verdict::Present => write!(f, "Present"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentResult {
    pub student_id: StudentId,
    pub name: String,
    pub present_count: u8,
    pub verdict: Verdict,
    pub checks: CheckRecord,
}

/// Evaluated attendance for one session. `students` is sorted absent
/// first, then by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceReport {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub students: Vec<StudentResult>,
    pub total_present: usize,
    pub total_absent: usize,
    pub attendance_rate: u32,
}

impl AttendanceReport {
    pub fn roster_size(&self) -> usize {
        self.students.len()
    }

    pub fn absent_names(&self) -> impl Iterator<Item = &str> {
        self.students
            .iter()
            .filter(|s| s.verdict == Verdict::Absent)
            .map(|s| s.name.as_str())
    }
}

/// Percentage of students present, rounded half up. Zero for an empty roster.
pub fn attendance_rate(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * present + total) / (2 * total)) as u32
}

/// Derive per-student verdicts and totals from a finished session.
///
/// Pure: the same session and roster always give the same report.
pub fn evaluate(data: &SessionData, roster: &[Student]) -> Result<AttendanceReport, SessionError> {
    if data.completed_checks() != 3 {
        return Err(SessionError::SessionIncomplete {
            completed: data.completed_checks(),
        });
    }

    let mut students = roster
        .iter()
        .map(|student| {
            let checks = *data.read_record(&student.id)?;
            let present_count = checks.present_count();
            Ok(StudentResult {
                student_id: student.id.clone(),
                name: student.name.clone(),
                present_count,
                verdict: Verdict::from_present_count(present_count),
                checks,
            })
        })
        .collect::<Result<Vec<_>, SessionError>>()?;

    students.sort_by(|a, b| {
        a.verdict
            .cmp(&b.verdict)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.student_id.cmp(&b.student_id))
    });

    let total_present = students
        .iter()
        .filter(|s| s.verdict == Verdict::Present)
        .count();
    let total_absent = students.len() - total_present;

    Ok(AttendanceReport {
        session_id: data.session_id.clone(),
        started_at: data.started_at,
        attendance_rate: attendance_rate(total_present, students.len()),
        students,
        total_present,
        total_absent,
    })
}
