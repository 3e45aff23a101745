// crates/unzip-relay-server/src/main.rs
// ============================================================================
// Module: Unzip Relay CLI Entry Point
// Description: Command dispatcher for the relay service.
// Purpose: Load configuration, wire stores and sinks, and serve push traffic.
// Dependencies: clap, tokio, unzip-relay-config, unzip-relay-server
// ============================================================================

//! ## Overview
//! The relay CLI exposes a single `serve` command: load the TOML
//! configuration, construct the store backends and audit sink, and run the
//! push endpoint until the process is terminated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use unzip_relay_config::RelayConfig;
use unzip_relay_core::audit::JobAuditSink;
use unzip_relay_server::FileJobAuditSink;
use unzip_relay_server::RelayServer;
use unzip_relay_server::StderrJobAuditSink;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "unzip-relay", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay push endpoint.
    Serve(ServeCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to unzip-relay.toml or env
    /// override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Append audit events to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    audit_log: Option<PathBuf>,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(message) => {
            let _ = writeln!(io::stderr(), "unzip-relay: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> Result<ExitCode, String> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        writeln!(io::stdout(), "unzip-relay {version}")
            .map_err(|err| format!("stdout write failed: {err}"))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        return Err("no command given; try `unzip-relay serve`".to_string());
    };
    match command {
        Commands::Serve(command) => command_serve(command).await,
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> Result<ExitCode, String> {
    let config = RelayConfig::load(command.config.as_deref())
        .map_err(|err| format!("config load failed: {err}"))?;
    let audit: Arc<dyn JobAuditSink> = match command.audit_log {
        Some(path) => Arc::new(
            FileJobAuditSink::new(&path)
                .map_err(|err| format!("audit log open failed: {err}"))?,
        ),
        None => Arc::new(StderrJobAuditSink),
    };
    let server = RelayServer::from_config(config, audit)
        .await
        .map_err(|err| format!("server init failed: {err}"))?;
    server.serve().await.map_err(|err| format!("server failed: {err}"))?;
    Ok(ExitCode::SUCCESS)
}
