use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

/// Opaque roster identity; the join key between a roster and session records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StudentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for StudentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A roster entry. Owned by the roster, never by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
}

impl Student {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: StudentId::new(),
            name: name.into(),
            photo_ref: None,
        }
    }

    pub fn with_photo(mut self, photo_ref: impl Into<String>) -> Self {
        self.photo_ref = Some(photo_ref.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Not yet evaluated in this round.
    #[default]
    Pending,
    Present,
    Absent,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Pending => write!(f, "pending"),
            CheckStatus::Present => write!(f, "present"),
            CheckStatus::Absent => write!(f, "absent"),
        }
    }
}

/// A status a caller is allowed to write. `Pending` is only ever the
/// initial value, so it is not representable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Present,
    Absent,
}

impl From<Mark> for CheckStatus {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::Present => CheckStatus::Present,
            Mark::Absent => CheckStatus::Absent,
        }
    }
}

/// One of the three checks in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CheckIndex {
    One = 1,
    Two = 2,
    Three = 3,
}

impl CheckIndex {
    pub const ALL: [CheckIndex; 3] = [CheckIndex::One, CheckIndex::Two, CheckIndex::Three];

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(CheckIndex::One),
            2 => Some(CheckIndex::Two),
            3 => Some(CheckIndex::Three),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn previous(self) -> Option<Self> {
        Self::from_number(self.number() - 1)
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    fn slot(self) -> usize {
        self as usize - 1
    }
}

impl fmt::Display for CheckIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// The three check outcomes of one student. Always exactly three slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckRecord([CheckStatus; 3]);

impl CheckRecord {
    pub fn new(check1: CheckStatus, check2: CheckStatus, check3: CheckStatus) -> Self {
        Self([check1, check2, check3])
    }

    pub fn get(&self, check: CheckIndex) -> CheckStatus {
        self.0[check.slot()]
    }

    pub fn statuses(&self) -> [CheckStatus; 3] {
        self.0
    }

    pub fn present_count(&self) -> u8 {
        self.0.iter().filter(|s| **s == CheckStatus::Present).count() as u8
    }

    fn set(&mut self, check: CheckIndex, status: CheckStatus) {
        self.0[check.slot()] = status;
    }
}

/// Which students a status mutation applies to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Selection<'a> {
    One(&'a StudentId),
    All,
}

/// The replayable record of one session.
///
/// `records` is keyed by student id and carries no ordering; anything that
/// needs an order gets it from the evaluator. Mutation is crate-private so
/// the only writes are the ones the check state machine has guarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    records: HashMap<StudentId, CheckRecord>,
    completed_checks: u8,
}

impl SessionData {
    /// Create a session with every check of every student pending.
    pub fn initialize<'a, I>(student_ids: I) -> Result<Self, SessionError>
    where
        I: IntoIterator<Item = &'a StudentId>,
    {
        let mut records = HashMap::new();
        for id in student_ids {
            if records.insert(id.clone(), CheckRecord::default()).is_some() {
                return Err(SessionError::DuplicateStudent(id.clone()));
            }
        }
        if records.is_empty() {
            return Err(SessionError::InvalidRoster);
        }

        Ok(Self {
            session_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            records,
            completed_checks: 0,
        })
    }

    pub fn completed_checks(&self) -> u8 {
        self.completed_checks
    }

    pub fn student_count(&self) -> usize {
        self.records.len()
    }

    pub fn read_record(&self, student_id: &StudentId) -> Result<&CheckRecord, SessionError> {
        self.records
            .get(student_id)
            .ok_or_else(|| SessionError::UnknownStudent(student_id.clone()))
    }

    /// Iterate over all records. Order is unspecified.
    pub fn records(&self) -> impl Iterator<Item = (&StudentId, &CheckRecord)> {
        self.records.iter()
    }

    pub(crate) fn set_status(
        &mut self,
        student_id: &StudentId,
        check: CheckIndex,
        mark: Mark,
    ) -> Result<(), SessionError> {
        if !self.records.contains_key(student_id) {
            return Err(SessionError::UnknownStudent(student_id.clone()));
        }
        self.apply(Selection::One(student_id), check, mark.into());
        Ok(())
    }

    pub(crate) fn set_all_for_check(&mut self, check: CheckIndex, mark: Mark) {
        self.apply(Selection::All, check, mark.into());
    }

    /// Force every pending slot of `check` to absent and advance the
    /// completed counter. Returns how many students were forced.
    pub(crate) fn commit(&mut self, check: CheckIndex) -> usize {
        let mut forced = 0;
        for record in self.records.values_mut() {
            if record.get(check) == CheckStatus::Pending {
                record.set(check, CheckStatus::Absent);
                forced += 1;
            }
        }
        self.completed_checks = self.completed_checks.max(check.number());
        forced
    }

    /// Check the invariants a deserialized record must hold.
    pub(crate) fn validate(&self) -> Result<(), SessionError> {
        if self.records.is_empty() {
            return Err(SessionError::InvalidRoster);
        }
        if self.completed_checks > 3 {
            return Err(SessionError::CorruptSession(format!(
                "completed_checks is {}",
                self.completed_checks
            )));
        }
        for check in CheckIndex::ALL
            .into_iter()
            .take(self.completed_checks as usize)
        {
            if let Some((id, _)) = self
                .records
                .iter()
                .find(|(_, r)| r.get(check) == CheckStatus::Pending)
            {
                return Err(SessionError::CorruptSession(format!(
                    "student {id} is still pending in finished check {check}"
                )));
            }
        }
        Ok(())
    }

    fn apply(
        &mut self,
        selection: Selection<'_>,
        check: CheckIndex,
        status: CheckStatus,
    ) {
        match selection {
            Selection::One(id) => {
                if let Some(record) = self.records.get_mut(id) {
                    record.set(check, status);
                }
            }
            Selection::All => {
                for record in self.records.values_mut() {
                    record.set(check, status);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<StudentId> {
        (0..n).map(|_| StudentId::new()).collect()
    }

    #[test]
    fn initialize_starts_all_pending() {
        let ids = ids(4);
        let data = SessionData::initialize(&ids).unwrap();

        assert_eq!(data.completed_checks(), 0);
        assert_eq!(data.student_count(), 4);
        for id in &ids {
            let record = data.read_record(id).unwrap();
            assert_eq!(record.statuses(), [CheckStatus::Pending; 3]);
        }
    }

    #[test]
    fn initialize_rejects_empty_roster() {
        let empty: Vec<StudentId> = Vec::new();
        assert_eq!(
            SessionData::initialize(&empty).unwrap_err(),
            SessionError::InvalidRoster
        );
    }

    #[test]
    fn initialize_rejects_duplicate_ids() {
        let id = StudentId::from("s-1");
        let err = SessionData::initialize(&[id.clone(), id.clone()]).unwrap_err();
        assert_eq!(err, SessionError::DuplicateStudent(id));
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let ids = ids(1);
        let a = SessionData::initialize(&ids).unwrap();
        let b = SessionData::initialize(&ids).unwrap();
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn set_status_touches_one_slot() {
        let ids = ids(2);
        let mut data = SessionData::initialize(&ids).unwrap();

        data.set_status(&ids[0], CheckIndex::Two, Mark::Present).unwrap();

        assert_eq!(
            data.read_record(&ids[0]).unwrap().statuses(),
            [CheckStatus::Pending, CheckStatus::Present, CheckStatus::Pending]
        );
        assert_eq!(
            data.read_record(&ids[1]).unwrap().statuses(),
            [CheckStatus::Pending; 3]
        );
    }

    #[test]
    fn set_status_unknown_student_changes_nothing() {
        let ids = ids(2);
        let mut data = SessionData::initialize(&ids).unwrap();
        let before = data.clone();

        let stranger = StudentId::from("nobody");
        let err = data
            .set_status(&stranger, CheckIndex::One, Mark::Present)
            .unwrap_err();

        assert_eq!(err, SessionError::UnknownStudent(stranger));
        assert_eq!(data, before);
    }

    #[test]
    fn set_all_for_check_marks_every_student() {
        let ids = ids(3);
        let mut data = SessionData::initialize(&ids).unwrap();

        data.set_all_for_check(CheckIndex::One, Mark::Absent);

        for id in &ids {
            assert_eq!(data.read_record(id).unwrap().get(CheckIndex::One), CheckStatus::Absent);
            assert_eq!(data.read_record(id).unwrap().get(CheckIndex::Two), CheckStatus::Pending);
        }
    }

    #[test]
    fn set_all_for_check_overrides_individual_marks() {
        let ids = ids(2);
        let mut data = SessionData::initialize(&ids).unwrap();

        data.set_status(&ids[0], CheckIndex::Two, Mark::Absent).unwrap();
        data.set_all_for_check(CheckIndex::Two, Mark::Present);
        data.set_status(&ids[1], CheckIndex::Two, Mark::Absent).unwrap();

        assert_eq!(data.read_record(&ids[0]).unwrap().get(CheckIndex::Two), CheckStatus::Present);
        assert_eq!(data.read_record(&ids[1]).unwrap().get(CheckIndex::Two), CheckStatus::Absent);
    }

    #[test]
    fn commit_forces_pending_to_absent_only() {
        let ids = ids(3);
        let mut data = SessionData::initialize(&ids).unwrap();
        data.set_status(&ids[0], CheckIndex::One, Mark::Present).unwrap();
        data.set_status(&ids[1], CheckIndex::One, Mark::Absent).unwrap();

        let forced = data.commit(CheckIndex::One);

        assert_eq!(forced, 1);
        assert_eq!(data.completed_checks(), 1);
        assert_eq!(data.read_record(&ids[0]).unwrap().get(CheckIndex::One), CheckStatus::Present);
        assert_eq!(data.read_record(&ids[1]).unwrap().get(CheckIndex::One), CheckStatus::Absent);
        assert_eq!(data.read_record(&ids[2]).unwrap().get(CheckIndex::One), CheckStatus::Absent);
    }

    #[test]
    fn read_record_unknown_student() {
        let data = SessionData::initialize(&ids(1)).unwrap();
        let stranger = StudentId::from("ghost");
        assert_eq!(
            data.read_record(&stranger).unwrap_err(),
            SessionError::UnknownStudent(stranger)
        );
    }

    #[test]
    fn validate_catches_pending_in_finished_check() {
        let ids = ids(2);
        let mut data = SessionData::initialize(&ids).unwrap();
        data.commit(CheckIndex::One);
        assert!(data.validate().is_ok());

        let mut json = serde_json::to_value(&data).unwrap();
        json["completed_checks"] = serde_json::json!(2);
        let tampered: SessionData = serde_json::from_value(json).unwrap();
        assert!(matches!(
            tampered.validate(),
            Err(SessionError::CorruptSession(_))
        ));
    }

    #[test]
    fn check_index_navigation() {
        assert_eq!(CheckIndex::One.previous(), None);
        assert_eq!(CheckIndex::Two.previous(), Some(CheckIndex::One));
        assert_eq!(CheckIndex::Three.next(), None);
        assert_eq!(CheckIndex::from_number(4), None);
        assert_eq!(CheckIndex::Two.to_string(), "2");
    }

    #[test]
    fn check_status_serializes_lowercase() {
        let record = CheckRecord::new(CheckStatus::Present, CheckStatus::Absent, CheckStatus::Pending);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"["present","absent","pending"]"#);
    }
}
