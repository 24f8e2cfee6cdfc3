use std::fmt::Write as _;
use std::io::{self, Cursor, Write};

use tracing::{info, warn};

use crate::assistant::AssistantClient;
use crate::cli::RosterAction;
use crate::config::RollcallConfig;
use crate::error::{ExportError, RollcallError, RosterError};
use crate::export::{ExportPayload, ReportSink, WebhookExporter};
use crate::insight;
use crate::profiles::ProfileStore;
use crate::roster::{self, Roster, SheetFetcher};
use crate::runner::SessionRunner;
use crate::session::{AttendanceReport, CompletedSession};
use crate::ui::{Activity, render_report};

const DEMO_SCRIPT: &str = "\
start 1
present A
finish
start 2
all present
finish
start 3
finish
report
";

/// What happened after a session was closed. The report is always kept,
/// whatever happened to the summary or the export.
#[derive(Debug)]
pub struct SessionClose {
    pub report: AttendanceReport,
    pub summary: Option<String>,
    /// `None` when no export was requested.
    pub export: Option<Result<(), ExportError>>,
}

/// Ties configuration, saved classes and external services together for
/// the CLI commands.
pub struct App {
    config: RollcallConfig,
    profiles: ProfileStore,
}

impl App {
    pub fn new(config: RollcallConfig) -> Result<Self, RollcallError> {
        let profiles = ProfileStore::open(&config.profiles_path)?;
        Ok(Self { config, profiles })
    }

    pub fn config(&self) -> &RollcallConfig {
        &self.config
    }

    pub fn list_classes(&self) -> String {
        if self.profiles.profiles().is_empty() {
            return "No classes saved yet. Add one with `rollcall roster <class> add <names..>`."
                .to_string();
        }
        let mut out = String::new();
        for profile in self.profiles.profiles() {
            let source = match &profile.sheet_url {
                Some(url) => format!(" (sheet: {url})"),
                None => String::new(),
            };
            let _ = writeln!(
                out,
                "{}: {} students{source}",
                profile.name,
                profile.students.len()
            );
        }
        out
    }

    /// Delete a saved class and its roster.
    pub fn remove_class(&mut self, class: &str) -> Result<String, RollcallError> {
        let removed = self
            .profiles
            .remove(class)
            .ok_or_else(|| RollcallError::ClassNotFound(class.to_string()))?;
        self.profiles.save()?;
        info!(class = %removed.name, "class removed");
        Ok(format!(
            "Removed {} ({} students).",
            removed.name,
            removed.students.len()
        ))
    }

    /// The saved roster for `class`.
    pub fn class_roster(&self, class: &str) -> Result<&Roster, RollcallError> {
        self.profiles
            .get(class)
            .map(|p| &p.students)
            .ok_or_else(|| RollcallError::ClassNotFound(class.to_string()))
    }

    /// Apply a roster action and persist the result. Returns a message for
    /// the user.
    pub async fn roster(
        &mut self,
        class: &str,
        action: RosterAction,
    ) -> Result<String, RollcallError> {
        let message = match action {
            RosterAction::List => {
                let roster = self.class_roster(class)?;
                if roster.is_empty() {
                    return Ok(format!("{class} has no students."));
                }
                let mut out = String::new();
                for (i, student) in roster.students().iter().enumerate() {
                    let _ = writeln!(out, "{:>3}. {}", i + 1, student.name);
                }
                return Ok(out);
            }
            RosterAction::Add { names } => {
                let profile = self.profiles.get_or_create(class);
                for name in &names {
                    profile.students.add(name)?;
                }
                format!("Added {} to {}.", names.len(), profile.name)
            }
            RosterAction::Remove { who } => {
                let profile = self
                    .profiles
                    .get_mut(class)
                    .ok_or_else(|| RollcallError::ClassNotFound(class.to_string()))?;
                let id = profile
                    .students
                    .find(&who)
                    .map(|s| s.id.clone())
                    .ok_or(RosterError::NotOnRoster(who))?;
                let removed = profile.students.remove(&id).map(|s| s.name);
                format!("Removed {}.", removed.unwrap_or_default())
            }
            RosterAction::Clear => {
                let profile = self
                    .profiles
                    .get_mut(class)
                    .ok_or_else(|| RollcallError::ClassNotFound(class.to_string()))?;
                profile.students.clear();
                format!("Cleared {}.", profile.name)
            }
            RosterAction::ImportCsv { file } => {
                let text = std::fs::read_to_string(&file)?;
                let students = roster::parse_csv(&text)?;
                let count = students.len();
                self.profiles.get_or_create(class).students.extend(students);
                format!("Imported {count} students from {}.", file.display())
            }
            RosterAction::LinkSheet { url } => {
                let fetcher = SheetFetcher::new(self.config.request_timeout())?;
                let activity = Activity::start("Fetching sheet...");
                let students = match fetcher.fetch(&url).await {
                    Ok(students) => {
                        activity.succeed("Sheet downloaded");
                        students
                    }
                    Err(e) => {
                        activity.fail("Sheet download failed");
                        return Err(e.into());
                    }
                };
                let count = students.len();
                let profile = self.profiles.get_or_create(class);
                // A linked sheet is the source of truth for the class.
                profile.students = Roster::from_students(students);
                profile.sheet_url = Some(url);
                format!("Linked sheet; {count} students loaded.")
            }
            RosterAction::Extract { text, file } => {
                let text = match (text, file) {
                    (Some(text), _) => text,
                    (None, Some(file)) => std::fs::read_to_string(file)?,
                    (None, None) => {
                        return Err(RollcallError::Config(
                            "extract needs text or --file".to_string(),
                        ));
                    }
                };
                let names = self.extract_names(&text).await;
                let profile = self.profiles.get_or_create(class);
                let added = profile.students.add_names(&names);
                format!("Extracted {added} names into {}.", profile.name)
            }
        };

        self.profiles.save()?;
        info!(class, "roster updated");
        Ok(message)
    }

    async fn extract_names(&self, text: &str) -> Vec<String> {
        let Some(client) = self.assistant() else {
            warn!("no API key configured, splitting text on lines");
            return roster::split_lines(text);
        };
        let activity = Activity::start("Extracting names...");
        let names = insight::extract_names(&client, text).await;
        activity.succeed(&format!("{} names found", names.len()));
        names
    }

    fn assistant(&self) -> Option<AssistantClient> {
        if !self.config.has_api_key() {
            return None;
        }
        match AssistantClient::new(
            self.config.api_key.clone(),
            self.config.model.clone(),
            self.config.request_timeout(),
        ) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "text service unavailable");
                None
            }
        }
    }

    /// Run an interactive session for `class` on the given streams.
    pub fn run_session<R: io::BufRead, W: Write>(
        &self,
        class: &str,
        input: R,
        out: W,
    ) -> Result<Option<CompletedSession>, RollcallError> {
        let roster = self.class_roster(class)?;
        let mut runner = SessionRunner::new(roster)?;
        Ok(runner.run(input, out)?)
    }

    /// Evaluate a finished session, ask for a summary when a text service
    /// is configured, and export when requested.
    pub async fn close_session(
        &self,
        class: &str,
        completed: &CompletedSession,
        export: bool,
    ) -> Result<SessionClose, RollcallError> {
        let report = completed.evaluate(self.class_roster(class)?.students())?;

        let summary = match self.assistant() {
            Some(client) => {
                let activity = Activity::start("Writing session summary...");
                let summary = insight::summarize_session(&client, &report).await;
                activity.succeed("Summary ready");
                Some(summary)
            }
            None => None,
        };

        let export = if export {
            Some(self.export_report(&report).await)
        } else {
            None
        };

        Ok(SessionClose {
            report,
            summary,
            export,
        })
    }

    async fn export_report(&self, report: &AttendanceReport) -> Result<(), ExportError> {
        let url = self
            .config
            .webhook_url
            .clone()
            .ok_or(ExportError::NotConfigured)?;
        let exporter = WebhookExporter::new(url, self.config.request_timeout())?;
        let activity = Activity::start("Exporting report...");
        match exporter.export(&ExportPayload::from_report(report)).await {
            Ok(()) => {
                activity.succeed("Report exported");
                Ok(())
            }
            Err(e) => {
                activity.fail("Export failed");
                warn!(error = %e, "report export failed");
                Err(e)
            }
        }
    }
}

/// Scripted two-student session: A is seen in checks 1 and 2, B only in
/// check 2. Writes the transcript and the report to `out`.
pub fn run_demo<W: Write>(mut out: W) -> Result<AttendanceReport, RollcallError> {
    let mut roster = Roster::new();
    roster.add_names(["A", "B"]);

    let mut runner = SessionRunner::new(&roster)?;
    let mut transcript = Vec::new();
    let completed = runner
        .run(Cursor::new(DEMO_SCRIPT), &mut transcript)?
        .ok_or_else(|| RollcallError::Config("demo script did not finish".to_string()))?;
    out.write_all(&transcript)?;

    let report = completed.evaluate(roster.students())?;
    writeln!(out)?;
    write!(out, "{}", render_report(&report))?;
    Ok(report)
}
