use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use vaxslot::commands::read_script;
use vaxslot::config::AppConfig;
use vaxslot::error::AppError;
use vaxslot::report::RowWriter;
use vaxslot::scheduling::{
    InMemorySchedulingRepository, SchedulingService, TracingNotificationSink,
};
use vaxslot::session::Session;
use vaxslot::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "vaxslot",
    about = "Replay vaccination scheduling scripts against the slot allocator",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a command script, writing report rows to stdout or --output
    Run(RunArgs),
    /// Parse a command script without executing it
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Command script, one command per line
    #[arg(long)]
    script: PathBuf,
    /// Simulated date of the first day (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    start_date: Option<NaiveDate>,
    /// Write rows to this file instead of stdout until the script redirects them
    #[arg(long)]
    output: Option<PathBuf>,
    /// Print the replay summary, including every reconciliation report, as JSON on stderr
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Command script to validate
    #[arg(long)]
    script: PathBuf,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Run(args) => run_script(args, config),
        Command::Check(args) => check_script(args),
    }
}

fn run_script(args: RunArgs, config: AppConfig) -> Result<(), AppError> {
    let RunArgs {
        script,
        start_date,
        output,
        json,
    } = args;

    let start = start_date.unwrap_or_else(|| Local::now().date_naive());
    let writer = match output {
        Some(path) => RowWriter::create(&path)?,
        None => RowWriter::stdout(),
    };

    let repository = Arc::new(InMemorySchedulingRepository::default());
    let notifier = Arc::new(TracingNotificationSink);
    let service = SchedulingService::new(repository, notifier, config.scheduling);
    let mut session = Session::new(service, start, writer);

    info!(
        environment = ?config.environment,
        script = %script.display(),
        %start,
        "replaying script"
    );
    let summary = session.run_script(File::open(&script)?)?;

    if json {
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for rejected in &summary.rejected {
            eprintln!("line {}: {}", rejected.line, rejected.message);
        }
    }
    Ok(())
}

fn check_script(args: CheckArgs) -> Result<(), AppError> {
    let lines = read_script(File::open(&args.script)?)?;

    let mut rejected = 0;
    for line in &lines {
        if let Err(err) = line.parse() {
            rejected += 1;
            eprintln!("line {}: {}", line.line, err);
        }
    }

    if rejected > 0 {
        return Err(AppError::InvalidScript { rejected });
    }
    println!("{} commands OK", lines.len());
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
