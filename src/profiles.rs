//! Saved class profiles, kept in a single JSON file.
//!
//! A profile holds a roster and, for classes linked to a published
//! spreadsheet, the sheet URL to refresh from. Sessions are never stored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::RollcallError;
use crate::roster::Roster;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_url: Option<String>,
    #[serde(default)]
    pub students: Roster,
}

impl ClassProfile {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            sheet_url: None,
            students: Roster::new(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    profiles: Vec<ClassProfile>,
}

pub struct ProfileStore {
    path: PathBuf,
    file: ProfileFile,
}

impl ProfileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, RollcallError> {
        let file = if path.exists() {
            let contents = fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        } else {
            ProfileFile::default()
        };
        debug!(path = %path.display(), profiles = file.profiles.len(), "profile store opened");
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn profiles(&self) -> &[ClassProfile] {
        &self.file.profiles
    }

    /// Case-insensitive lookup by class name.
    pub fn get(&self, name: &str) -> Option<&ClassProfile> {
        let name = name.trim();
        self.file
            .profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ClassProfile> {
        let name = name.trim();
        self.file
            .profiles
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn get_or_create(&mut self, name: &str) -> &mut ClassProfile {
        let pos = match self
            .file
            .profiles
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name.trim()))
        {
            Some(pos) => pos,
            None => {
                self.file.profiles.push(ClassProfile::new(name));
                self.file.profiles.len() - 1
            }
        };
        &mut self.file.profiles[pos]
    }

    pub fn remove(&mut self, name: &str) -> Option<ClassProfile> {
        let pos = self
            .file
            .profiles
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name.trim()))?;
        Some(self.file.profiles.remove(pos))
    }

    pub fn save(&self) -> Result<(), RollcallError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.file)?)?;
        debug!(path = %self.path.display(), "profile store saved");
        Ok(())
    }
}
