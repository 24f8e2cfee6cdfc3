//! Interface de terminal do rollcall: spinners e saída colorida.
//!
//! Usa `indicatif` para o spinner exibido enquanto uma chamada externa
//! está pendente e `console` para colorir o quadro de verificações e o
//! relatório final.

use std::fmt::Write as _;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::session::{
    AttendanceReport, AttendanceSession, CheckIndex, CheckPhase, CheckStatus, Student, Verdict,
};

/// Spinner para uma chamada externa (planilha, serviço de texto, webhook).
pub struct Activity {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl Activity {
    /// Inicia o spinner com a mensagem fornecida.
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    pub fn succeed(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    pub fn fail(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.red.apply_to("✗"));
    }
}

fn status_cell(status: CheckStatus) -> String {
    match status {
        CheckStatus::Present => Style::new().green().apply_to("✓").to_string(),
        CheckStatus::Absent => Style::new().red().apply_to("✗").to_string(),
        CheckStatus::Pending => Style::new().dim().apply_to("·").to_string(),
    }
}

fn phase_label(phase: CheckPhase) -> String {
    let style = match phase {
        CheckPhase::Active => Style::new().cyan().bold(),
        CheckPhase::Ready => Style::new().yellow(),
        CheckPhase::Completed => Style::new().green(),
        CheckPhase::Locked => Style::new().dim(),
    };
    style.apply_to(phase.to_string()).to_string()
}

/// Quadro com a fase de cada verificação e o status de cada aluno.
pub fn render_board(session: &AttendanceSession, roster: &[Student]) -> String {
    let mut out = String::new();
    let phases: Vec<String> = CheckIndex::ALL
        .iter()
        .map(|c| format!("check {c}: {}", phase_label(session.phase(*c))))
        .collect();
    let _ = writeln!(out, "{}", phases.join("   "));

    let width = roster.iter().map(|s| s.name.chars().count()).max().unwrap_or(0);
    for (i, student) in roster.iter().enumerate() {
        let cells = match session.data().read_record(&student.id) {
            Ok(record) => record
                .statuses()
                .iter()
                .map(|s| status_cell(*s))
                .collect::<Vec<_>>()
                .join("  "),
            Err(_) => Style::new().dim().apply_to("(not in session)").to_string(),
        };
        let _ = writeln!(out, "{:>3}. {:<width$}  {cells}", i + 1, student.name);
    }
    out
}

/// Relatório final: totais seguidos da lista ordenada (ausentes primeiro).
pub fn render_report(report: &AttendanceReport) -> String {
    let mut out = String::new();
    let bold = Style::new().bold();
    let _ = writeln!(
        out,
        "{}  {}",
        bold.apply_to("Session Report"),
        report.started_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(
        out,
        "Attendance rate: {}   Present: {}   Absent: {}",
        Style::new().cyan().bold().apply_to(format!("{}%", report.attendance_rate)),
        Style::new().green().apply_to(report.total_present),
        Style::new().red().apply_to(report.total_absent),
    );

    let width = report
        .students
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0);
    for result in &report.students {
        let bar: String = "■".repeat(result.present_count as usize)
            + &"□".repeat(3 - result.present_count as usize);
        let verdict = match result.verdict {
            Verdict::Present => Style::new().green().apply_to(result.verdict),
            Verdict::Absent => Style::new().red().apply_to(result.verdict),
        };
        let _ = writeln!(out, "  {:<width$}  {bar}  {verdict}", result.name);
    }
    out
}
