//! Interactive driver for a live session.
//!
//! Reads one command per line, applies it to an [`AttendanceSession`] and
//! writes feedback. Rejected commands leave the session untouched and the
//! loop carries on.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use clap::ValueEnum;
use tracing::debug;

use crate::cli::MarkArg;
use crate::error::SessionError;
use crate::roster::Roster;
use crate::session::{
    AttendanceSession, CheckIndex, CheckStatus, CompletedSession, Mark, StudentId,
};
use crate::ui::render_board;

pub const HELP: &str = "\
commands:
  start [N]              start check N (default: the next unlocked check)
  present <who>          mark a student present in the running check
  absent <who>           mark a student absent in the running check
  toggle <who>           flip a student between present and absent
  all present|absent     mark every student in the running check
  finish                 close the running check (unmarked -> absent)
  board                  show the check board
  report                 finish the session and build the report
  quit                   abandon the session
<who> is a roster number or a name.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start(Option<CheckIndex>),
    Mark { who: String, mark: Mark },
    Toggle(String),
    All(Mark),
    Finish,
    Board,
    Report,
    Help,
    Quit,
}

impl FromStr for SessionCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let who = |rest: &str| {
            if rest.is_empty() {
                Err(format!("`{verb}` needs a student number or name"))
            } else {
                Ok(rest.to_string())
            }
        };

        match verb.to_lowercase().as_str() {
            "start" if rest.is_empty() => Ok(SessionCommand::Start(None)),
            "start" => rest
                .parse::<u8>()
                .ok()
                .and_then(CheckIndex::from_number)
                .map(|c| SessionCommand::Start(Some(c)))
                .ok_or_else(|| format!("no check `{rest}`; checks are 1, 2 and 3")),
            "present" | "p" => Ok(SessionCommand::Mark {
                who: who(rest)?,
                mark: Mark::Present,
            }),
            "absent" | "a" => Ok(SessionCommand::Mark {
                who: who(rest)?,
                mark: Mark::Absent,
            }),
            "toggle" | "t" => Ok(SessionCommand::Toggle(who(rest)?)),
            "all" => MarkArg::from_str(rest, true)
                .map(|m| SessionCommand::All(m.into()))
                .map_err(|_| "usage: all present|absent".to_string()),
            "finish" | "done" => Ok(SessionCommand::Finish),
            "board" | "b" => Ok(SessionCommand::Board),
            "report" => Ok(SessionCommand::Report),
            "help" | "?" => Ok(SessionCommand::Help),
            "quit" | "exit" | "q" => Ok(SessionCommand::Quit),
            "" => Err("type `help` for commands".to_string()),
            other => Err(format!("unknown command `{other}`; type `help`")),
        }
    }
}

/// What the loop should do after a command.
#[derive(Debug)]
pub enum Step {
    Continue(String),
    Done(CompletedSession),
    Quit,
}

pub struct SessionRunner<'a> {
    session: AttendanceSession,
    roster: &'a Roster,
}

impl<'a> SessionRunner<'a> {
    pub fn new(roster: &'a Roster) -> Result<Self, SessionError> {
        Ok(Self {
            session: AttendanceSession::start(roster.students())?,
            roster,
        })
    }

    pub fn session(&self) -> &AttendanceSession {
        &self.session
    }

    pub fn handle(&mut self, command: SessionCommand) -> Result<Step, SessionError> {
        debug!(?command, "session command");
        match command {
            SessionCommand::Start(requested) => {
                let check = match requested {
                    Some(check) => check,
                    None => self.next_startable()?,
                };
                self.session.start_check(check)?;
                Ok(Step::Continue(format!(
                    "Check {check} started. Mark who is here, then `finish`."
                )))
            }
            SessionCommand::Mark { who, mark } => {
                let check = self.running_check()?;
                let id = self.resolve(&who)?;
                self.session.set_status(&id, check, mark)?;
                Ok(Step::Continue(format!(
                    "{} -> {}",
                    self.name_of(&id),
                    CheckStatus::from(mark)
                )))
            }
            SessionCommand::Toggle(who) => {
                let check = self.running_check()?;
                let id = self.resolve(&who)?;
                let status = self.session.toggle(&id, check)?;
                Ok(Step::Continue(format!("{} -> {status}", self.name_of(&id))))
            }
            SessionCommand::All(mark) => {
                let check = self.running_check()?;
                self.session.set_all_for_check(check, mark)?;
                Ok(Step::Continue(format!(
                    "Everyone -> {} in check {check}",
                    CheckStatus::from(mark)
                )))
            }
            SessionCommand::Finish => {
                let check = self.running_check()?;
                let outcome = self.session.finish_check(check)?;
                let mut message = format!("Check {check} finished");
                if outcome.forced_absent > 0 {
                    message.push_str(&format!(
                        "; {} unmarked recorded absent",
                        outcome.forced_absent
                    ));
                }
                match outcome.unlocked {
                    Some(next) => message.push_str(&format!(". Check {next} unlocked.")),
                    None => message.push_str(". All checks done; type `report`."),
                }
                Ok(Step::Continue(message))
            }
            SessionCommand::Board => Ok(Step::Continue(render_board(
                &self.session,
                self.roster.students(),
            ))),
            SessionCommand::Report => Ok(Step::Done(self.session.finalize()?)),
            SessionCommand::Help => Ok(Step::Continue(HELP.to_string())),
            SessionCommand::Quit => Ok(Step::Quit),
        }
    }

    /// Drive the session from `input` until a report is produced, the
    /// user quits, or input ends. Returns the frozen session on report.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut out: W,
    ) -> io::Result<Option<CompletedSession>> {
        writeln!(out, "{HELP}\n")?;
        write!(out, "{}", render_board(&self.session, self.roster.students()))?;

        for line in input.lines() {
            let line = line?;
            let command = match line.parse::<SessionCommand>() {
                Ok(command) => command,
                Err(message) => {
                    writeln!(out, "{message}")?;
                    continue;
                }
            };
            match self.handle(command) {
                Ok(Step::Continue(message)) => writeln!(out, "{}", message.trim_end())?,
                Ok(Step::Done(completed)) => return Ok(Some(completed)),
                Ok(Step::Quit) => return Ok(None),
                Err(e) => writeln!(out, "error: {e}")?,
            }
        }
        Ok(None)
    }

    fn next_startable(&self) -> Result<CheckIndex, SessionError> {
        if let Some(active) = self.session.active_check() {
            return Err(SessionError::CheckAlreadyActive {
                active,
                requested: active.next().unwrap_or(active),
            });
        }
        self.session
            .next_check()
            .ok_or(SessionError::CheckAlreadyCompleted(CheckIndex::Three))
    }

    fn running_check(&self) -> Result<CheckIndex, SessionError> {
        self.session.active_check().ok_or_else(|| {
            SessionError::CheckNotActive(self.session.next_check().unwrap_or(CheckIndex::Three))
        })
    }

    fn resolve(&self, who: &str) -> Result<StudentId, SessionError> {
        self.roster
            .find(who)
            .map(|s| s.id.clone())
            .ok_or_else(|| SessionError::UnknownStudent(StudentId::from(who.trim())))
    }

    fn name_of(&self, id: &StudentId) -> &str {
        self.roster
            .students()
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.name.as_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::session::Verdict;

    fn roster() -> Roster {
        let mut roster = Roster::new();
        roster.add_names(["Ann", "Ben"]);
        roster
    }

    #[test]
    fn parses_commands() {
        assert_eq!("start".parse::<SessionCommand>(), Ok(SessionCommand::Start(None)));
        assert_eq!(
            "START 2".parse::<SessionCommand>(),
            Ok(SessionCommand::Start(Some(CheckIndex::Two)))
        );
        assert_eq!(
            "present Mary Jane".parse::<SessionCommand>(),
            Ok(SessionCommand::Mark {
                who: "Mary Jane".into(),
                mark: Mark::Present,
            })
        );
        assert_eq!("t 3".parse::<SessionCommand>(), Ok(SessionCommand::Toggle("3".into())));
        assert_eq!("all absent".parse::<SessionCommand>(), Ok(SessionCommand::All(Mark::Absent)));
        assert_eq!("q".parse::<SessionCommand>(), Ok(SessionCommand::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!("start 4".parse::<SessionCommand>().is_err());
        assert!("present".parse::<SessionCommand>().is_err());
        assert!("all maybe".parse::<SessionCommand>().is_err());
        assert!("dance".parse::<SessionCommand>().is_err());
        assert!("".parse::<SessionCommand>().is_err());
    }

    #[test]
    fn marking_without_a_running_check_is_rejected() {
        let roster = roster();
        let mut runner = SessionRunner::new(&roster).unwrap();
        let err = runner
            .handle(SessionCommand::Mark {
                who: "Ann".into(),
                mark: Mark::Present,
            })
            .unwrap_err();
        assert_eq!(err, SessionError::CheckNotActive(CheckIndex::One));
    }

    #[test]
    fn unknown_student_reference() {
        let roster = roster();
        let mut runner = SessionRunner::new(&roster).unwrap();
        runner.handle(SessionCommand::Start(None)).unwrap();
        assert!(matches!(
            runner.handle(SessionCommand::Toggle("7".into())),
            Err(SessionError::UnknownStudent(_))
        ));
        assert!(matches!(
            runner.handle(SessionCommand::Toggle("Cal".into())),
            Err(SessionError::UnknownStudent(_))
        ));
    }

    #[test]
    fn start_without_number_follows_order() {
        let roster = roster();
        let mut runner = SessionRunner::new(&roster).unwrap();
        runner.handle(SessionCommand::Start(None)).unwrap();
        assert_eq!(runner.session().active_check(), Some(CheckIndex::One));
        assert!(matches!(
            runner.handle(SessionCommand::Start(None)),
            Err(SessionError::CheckAlreadyActive { .. })
        ));
        runner.handle(SessionCommand::Finish).unwrap();
        runner.handle(SessionCommand::Start(None)).unwrap();
        assert_eq!(runner.session().active_check(), Some(CheckIndex::Two));
    }

    #[test]
    fn scripted_session_produces_report() {
        let roster = roster();
        let script = "\
start 1
present ann
finish
start 2
start 3
all present
finish
report
start
finish
report
";
        let mut out = Vec::new();
        let mut runner = SessionRunner::new(&roster).unwrap();
        let completed = runner
            .run(Cursor::new(script), &mut out)
            .unwrap()
            .expect("session should complete");

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("1 unmarked recorded absent"));
        assert!(output.contains("error: check 2 is still running"));
        assert!(output.contains("error: session is incomplete: 2 of 3 checks finished"));

        let report = completed.evaluate(roster.students()).unwrap();
        let ann = report.students.iter().find(|s| s.name == "Ann").unwrap();
        let ben = report.students.iter().find(|s| s.name == "Ben").unwrap();
        assert_eq!(ann.verdict, Verdict::Present);
        assert_eq!(ben.verdict, Verdict::Absent);
        assert_eq!(ben.checks.get(CheckIndex::Three), CheckStatus::Absent);
        assert_eq!(report.attendance_rate, 50);
    }

    #[test]
    fn quitting_or_eof_abandons_the_session() {
        let roster = roster();
        let mut runner = SessionRunner::new(&roster).unwrap();
        let result = runner.run(Cursor::new("start\nquit\n"), Vec::new()).unwrap();
        assert!(result.is_none());

        let mut runner = SessionRunner::new(&roster).unwrap();
        assert!(runner.run(Cursor::new("start\n"), Vec::new()).unwrap().is_none());
    }
}
