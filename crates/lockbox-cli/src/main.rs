//! `lockbox` - example client for the Lockbox record service.
//!
//! Writes a feedback record, reads it back, prints every visible record and
//! the feedback comments shared with this client.

mod register;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use lockbox::{ClientId, ConfigError, ErrorKind};

const USAGE: &str = "Usage: lockbox CLIENT_ID API_KEY_ID API_SECRET";

/// Lockbox example client.
#[derive(Debug, Parser)]
#[command(
    name = "lockbox",
    version,
    about = "Write, share and list encrypted Lockbox records",
    args_conflicts_with_subcommands = true,
    after_help = "With no positional arguments, configuration is read from ~/.lockbox/config.json.\n\
                  Set LOCKBOX_LOG (e.g. LOCKBOX_LOG=debug) to change the log level."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an identity, register it with a local service and write the
    /// config file.
    Register(RegisterArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// CLIENT_ID API_KEY_ID API_SECRET, or nothing to use the config file.
    #[arg(value_name = "CREDENTIALS")]
    credentials: Vec<String>,

    /// Read configuration from this file instead of ~/.lockbox/config.json.
    #[arg(long, env = "LOCKBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Share this client's feedback records with another client.
    #[arg(long, value_name = "CLIENT_ID")]
    share_with: Option<ClientId>,

    /// Let every client whose feedback is shown read this client's
    /// thank-you records.
    #[arg(long)]
    thank: bool,

    /// Do not write a new feedback record.
    #[arg(long)]
    no_write: bool,

    /// Maximum number of records to list.
    #[arg(long, default_value_t = 100)]
    limit: usize,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Service to register with: sqlite://<path>. Defaults to
    /// ~/.lockbox/lockbox.db.
    #[arg(long, env = "LOCKBOX_URL")]
    url: Option<String>,

    /// Where to write the configuration.
    #[arg(long, env = "LOCKBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Overwrite an existing configuration file.
    #[arg(long)]
    force: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LOCKBOX_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// True if the error means the configuration could not be read.
fn is_config_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ConfigError>().is_some()
        || err
            .downcast_ref::<lockbox::Error>()
            .is_some_and(|e| e.kind() == ErrorKind::Config)
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Command::Register(args)) => register::register(args).await,
        None => run::run(cli.run).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_config_error(&err) => {
            eprintln!("Could not read configuration from file or command line: {err:#}");
            eprintln!("{USAGE}");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
