//! riskdesk binary entry point.
//!
//! Loads settings and credentials, builds the team and runs one
//! conversation per country, printing messages as they are produced.
//! Ctrl-c cancels every run in flight.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use riskdesk::console::{render_message, render_status};
use riskdesk::orchestrator::{exit_code, RunHooks, TeamConfig};
use riskdesk::tracing_ext::{init_tracing, LogFormat};
use riskdesk::{Credentials, Desk, Message, SearchClient, SearchConfig, Settings};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Round-robin research desk for sovereign risk reports.
#[derive(Parser, Debug)]
#[command(name = "riskdesk", version, about = "Round-robin research desk for sovereign risk reports")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,

    /// Settings file (YAML or TOML); `RISKDESK__*` variables override it.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the desk for one or more countries.
    Run(RunArgs),
    /// Run a single search and print the record as JSON.
    Search {
        /// Country to research.
        country: String,
        /// Specific question; a general overview is requested when absent.
        query: Option<String>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Country to report on; repeat for several concurrent runs.
    #[arg(long = "country", required = true, num_args = 1..)]
    countries: Vec<String>,

    /// Override the team's turn budget.
    #[arg(long)]
    max_turns: Option<u32>,

    /// Team template; the built-in sovereign risk team when absent.
    #[arg(long)]
    team: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(format)?;

    let settings = Settings::load(cli.settings.as_deref())?;
    let code = match cli.command {
        Command::Run(args) => run(args, settings).await?,
        Command::Search { country, query } => search(&country, query.as_deref(), settings).await?,
    };

    std::process::exit(code);
}

async fn run(args: RunArgs, settings: Settings) -> Result<i32> {
    let mut team = match &args.team {
        Some(path) => TeamConfig::from_file(path)?,
        None => TeamConfig::builtin()?,
    };
    if let Some(max_turns) = args.max_turns {
        team = team.with_max_turns(max_turns)?;
    }

    let desk = Desk::new(team, settings, Credentials::from_env()?)?;
    tracing::info!(team = %desk.team().name, countries = ?args.countries, "starting desk");

    let label_subjects = args.countries.len() > 1;
    let batch = desk.plan(&args.countries, |subject| {
        let subject = label_subjects.then(|| subject.to_string());
        RunHooks {
            on_message: Some(Arc::new(move |message: &Message| -> riskdesk::Result<()> {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{}", render_message(subject.as_deref(), message))?;
                Ok(())
            })),
            on_terminated: None,
        }
    })?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling runs");
            let _ = shutdown_tx.send(true);
        }
    });

    let outcomes = batch.execute(shutdown_rx).await;
    for outcome in &outcomes {
        println!("{}", render_status(outcome));
    }
    Ok(exit_code(&outcomes))
}

async fn search(country: &str, query: Option<&str>, settings: Settings) -> Result<i32> {
    let config = SearchConfig::from_env()?.with_settings(&settings.search)?;
    let client = SearchClient::new(config)?;
    let record = client.search(country, query).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(0)
}
