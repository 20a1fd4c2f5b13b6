use anyhow::Context;
use clap::{Parser, Subcommand};
use lecture_pacer_lib::config;
use lecture_pacer_lib::coordinator::RunReport;
use lecture_pacer_lib::progress::ProgressReporter;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_SETUP_FAILURE: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "lecture-pacer",
    version,
    about = "Play a classroom's lecture videos by sending real-time progress heartbeats"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file; defaults to ./config.json, then the user config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `max_parallel` from the config
    #[arg(long, global = true)]
    max_parallel: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play every unfinished video of the configured classroom (default)
    Run,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Run) {
        Command::Run => match run(cli.config, cli.max_parallel).await {
            Ok(report) => summarize(&report),
            Err(err) => {
                error!("{err:#}");
                ExitCode::from(EXIT_SETUP_FAILURE)
            }
        },
    }
}

async fn run(config_path: Option<PathBuf>, max_parallel: Option<usize>) -> anyhow::Result<RunReport> {
    let mut config = config::load(config_path.as_deref()).context("could not load configuration")?;
    if let Some(max_parallel) = max_parallel {
        config.max_parallel = max_parallel.clamp(1, Semaphore::MAX_PERMITS);
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after in-flight heartbeats");
            on_signal.cancel();
        }
    });

    let reporter = Arc::new(ProgressReporter::stderr());
    let report = lecture_pacer_lib::run(&config, reporter, cancel)
        .await
        .with_context(|| format!("could not start classroom {}", config.classroom_id))?;
    Ok(report)
}

fn summarize(report: &RunReport) -> ExitCode {
    info!(
        completed = report.completed_count(),
        total = report.results.len(),
        "all videos processed"
    );

    for failure in report.failures() {
        let reason = failure
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown".to_string());
        error!(video_id = failure.video_id, title = %failure.title, "{reason}");
    }

    ExitCode::from(report.exit_code())
}
