use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;

use rollcall::cli::{ClassAction, Cli, Command};
use rollcall::commands::{App, run_demo};
use rollcall::config::RollcallConfig;
use rollcall::logging;
use rollcall::ui::render_report;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    run(cli.config.as_deref(), cli.command).await
}

fn open_app(config: Option<&Path>) -> Result<App> {
    let config = RollcallConfig::load(config)?;
    Ok(App::new(config)?)
}

async fn run(config: Option<&Path>, command: Command) -> Result<()> {
    match command {
        Command::Demo => {
            run_demo(io::stdout().lock())?;
        }
        Command::Classes { action } => {
            let mut app = open_app(config)?;
            match action.unwrap_or(ClassAction::List) {
                ClassAction::List => print!("{}", app.list_classes()),
                ClassAction::Remove { class } => println!("{}", app.remove_class(&class)?),
            }
        }
        Command::Roster { class, action } => {
            let mut app = open_app(config)?;
            let message = app.roster(&class, action).await?;
            println!("{}", message.trim_end());
        }
        Command::Session { class, export } => {
            let app = open_app(config)?;
            if export && app.config().webhook_url.is_none() {
                anyhow::bail!("--export needs webhook_url in rollcall.toml or ROLLCALL_WEBHOOK_URL");
            }
            let completed = app.run_session(&class, io::stdin().lock(), io::stdout())?;
            let Some(completed) = completed else {
                println!("Session abandoned; nothing was recorded.");
                return Ok(());
            };

            let closed = app.close_session(&class, &completed, export).await?;
            println!();
            print!("{}", render_report(&closed.report));
            if let Some(summary) = closed.summary {
                println!();
                println!("{}", Style::new().magenta().bold().apply_to("Session insight"));
                println!("{summary}");
            }
            if let Some(outcome) = closed.export {
                outcome.context("report shown above was not exported")?;
            }
        }
    }
    Ok(())
}
