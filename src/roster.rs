//! Roster acquisition: manual entry, CSV files and published spreadsheets.
//!
//! Every source produces [`Student`]s with fresh ids. The roster keeps
//! insertion order, which is the order an instructor sees while marking.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RosterError;
use crate::session::{Student, StudentId};

const NAME_HEADERS: &[&str] = &["name", "student"];
const PHOTO_HEADERS: &[&str] = &["photo", "image", "pic", "url", "avatar"];
const DRIVE_HOST: &str = "drive.google.com";

/// Ordered list of students eligible for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    students: Vec<Student>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_students(students: Vec<Student>) -> Self {
        Self { students }
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Add a single student by name.
    pub fn add(&mut self, name: &str) -> Result<&Student, RosterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RosterError::BlankName);
        }
        self.students.push(Student::new(name));
        Ok(&self.students[self.students.len() - 1])
    }

    /// Append names, skipping blanks. Returns how many were added.
    pub fn add_names<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter(|name| self.add(name.as_ref()).is_ok())
            .count()
    }

    pub fn extend(&mut self, students: impl IntoIterator<Item = Student>) {
        self.students.extend(students);
    }

    pub fn remove(&mut self, id: &StudentId) -> Option<Student> {
        let pos = self.students.iter().position(|s| &s.id == id)?;
        Some(self.students.remove(pos))
    }

    pub fn clear(&mut self) {
        self.students.clear();
    }

    /// Look a student up by 1-based position or by case-insensitive name.
    pub fn find(&self, who: &str) -> Option<&Student> {
        let who = who.trim();
        if let Ok(pos) = who.parse::<usize>() {
            return pos.checked_sub(1).and_then(|i| self.students.get(i));
        }
        self.students
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(who))
    }
}

/// Split free text into one name per non-blank line.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a CSV export with a header row.
///
/// The name column is the first header containing "name" or "student";
/// an optional photo column is the first containing "photo", "image",
/// "pic", "url" or "avatar". Rows with a blank name are skipped.
pub fn parse_csv(text: &str) -> Result<Vec<Student>, RosterError> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Err(RosterError::EmptyCsv);
    }
    let cleaned = lines.join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(cleaned.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    let column = |keys: &[&str]| headers.iter().position(|h| keys.iter().any(|k| h.contains(k)));
    let name_col = column(NAME_HEADERS).ok_or(RosterError::MissingNameColumn)?;
    let photo_col = column(PHOTO_HEADERS);

    let mut students = Vec::new();
    for row in reader.records() {
        let row = row?;
        let Some(name) = row.get(name_col).filter(|n| !n.is_empty()) else {
            continue;
        };
        let mut student = Student::new(name);
        if let Some(photo) = photo_col
            .and_then(|c| row.get(c))
            .filter(|p| !p.is_empty())
        {
            student = student.with_photo(normalize_photo_url(photo));
        }
        students.push(student);
    }

    debug!(count = students.len(), "parsed roster CSV");
    Ok(students)
}

/// Rewrite Google Drive share links into direct image links. Other URLs
/// are returned trimmed.
pub fn normalize_photo_url(url: &str) -> String {
    let trimmed = url.trim();
    let Some(host) = trimmed.find(DRIVE_HOST) else {
        return trimmed.to_string();
    };
    let rest = &trimmed[host + DRIVE_HOST.len()..];

    let mut markers: Vec<usize> = ["id=", "/d/"]
        .iter()
        .flat_map(|m| rest.match_indices(m).map(|(i, m)| i + m.len()))
        .collect();
    markers.sort_unstable_by(|a, b| b.cmp(a));

    markers
        .into_iter()
        .map(|start| {
            rest[start..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect::<String>()
        })
        .find(|id| !id.is_empty())
        .map(|id| format!("https://{DRIVE_HOST}/uc?export=view&id={id}"))
        .unwrap_or_else(|| trimmed.to_string())
}

/// Downloads published spreadsheets ("Publish to web" CSV links).
pub struct SheetFetcher {
    client: Client,
}

impl SheetFetcher {
    pub fn new(timeout: Duration) -> Result<Self, RosterError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<Student>, RosterError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RosterError::Fetch {
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        let students = parse_csv(&body)?;
        info!(url, count = students.len(), "imported roster from sheet");
        Ok(students)
    }
}
