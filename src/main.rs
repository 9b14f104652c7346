use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stack_tail::app::Config;
use stack_tail::render::TerminalRenderer;
use stack_tail::stack::AwsCliProvider;
use stack_tail::tail::{TailConfig, TailMode, TailOutcome, TailSession, TailSummary};

/// Exit status for configuration and provider errors
const EXIT_FAILURE: u8 = 1;
/// Exit status after Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

/// stack-tail - follow CloudFormation stack events in the terminal
#[derive(Parser)]
#[command(name = "stack-tail")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Name of the stack to tail
    #[arg(value_name = "STACK")]
    stack_name: String,

    /// Number of events shown initially (1-100, default 5)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..=100))]
    number: Option<u64>,

    /// Keep polling until the stack reaches a complete or failed status
    #[arg(short, long)]
    die: bool,

    /// Keep polling forever (overrides --die)
    #[arg(short, long)]
    follow: bool,

    /// Print the stack outputs once tailing ends
    #[arg(short, long)]
    outputs: bool,

    /// Region to query
    #[arg(short, long, env = "AWS_REGION")]
    region: Option<String>,

    /// Named credential profile
    #[arg(short, long, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// Disable colored statuses
    #[arg(long)]
    no_color: bool,

    /// Config file (default: ~/.config/stack-tail/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Write diagnostics to stderr instead of the log file
    #[arg(long)]
    log_stderr: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures
            let code = if e.use_stderr() { EXIT_FAILURE } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    ExitCode::from(exit_status(run(cli)))
}

/// Process exit status for a finished (or failed) run
fn exit_status(result: Result<TailOutcome>) -> u8 {
    match result {
        Ok(TailOutcome::Cancelled) => EXIT_INTERRUPTED,
        Ok(_) => 0,
        Err(e) => {
            eprintln!("error: {:#}", e);
            EXIT_FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<TailOutcome> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "warn".to_string());
    init_logging(&level, cli.log_stderr);

    let tail_config = TailConfig {
        stack_name: cli.stack_name.clone(),
        initial_count: config.initial_count(cli.number.map(|n| n as usize))?,
        mode: TailMode::from_flags(cli.follow, cli.die),
        print_outputs: cli.outputs,
        timing: config.timing(),
    };

    let color = !cli.no_color
        && config.color.unwrap_or(true)
        && std::env::var_os("NO_COLOR").is_none()
        && std::io::stdout().is_terminal();

    let provider = AwsCliProvider::new(config.provider_config(cli.region, cli.profile));
    let renderer = TerminalRenderer::stdout(color);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    let summary = runtime.block_on(tail(tail_config, provider, renderer))?;
    Ok(summary.outcome)
}

async fn tail(
    config: TailConfig,
    provider: AwsCliProvider,
    renderer: TerminalRenderer<std::io::Stdout>,
) -> Result<TailSummary> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut session = TailSession::new(config, provider, renderer).with_shutdown(shutdown_rx);
    session.run().await
}

/// Log to a file under the data dir, or to stderr when asked or when the
/// file cannot be opened
fn init_logging(level: &str, to_stderr: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let log_dir = directories::ProjectDirs::from("", "", "stack-tail")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("stack-tail"));
    let log_file = if to_stderr {
        None
    } else {
        match open_log_file(&log_dir) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("warning: cannot open log file in {}: {}", log_dir.display(), e);
                None
            }
        }
    };

    match log_file {
        Some(file) => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .init(),
        None => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }

    info!("stack-tail starting");
}

fn open_log_file(dir: &Path) -> std::io::Result<File> {
    std::fs::create_dir_all(dir)?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("stack-tail.log"))
}
