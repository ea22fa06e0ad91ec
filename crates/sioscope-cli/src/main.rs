//! # sioscope-cli
//!
//! Binary entry point for the sioscope inspection console.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Configuration loading and logging setup
//! - The interactive TUI and the headless console loops
//! - Offline `builders` and `preview` subcommands

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use sioscope_adapters::{HeadlessPresenter, WriterSink, drive, spawn_stdin_reader, spawn_transport};
use sioscope_core::{BuilderRegistry, Console, SioscopeConfig};
use sioscope_tui::Tui;
use std::cell::RefCell;
use std::fs::OpenOptions;
use std::io::{IsTerminal, stdout};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// sioscope - live inspection console for WebSocket protocol sessions
#[derive(Parser, Debug)]
#[command(name = "sioscope", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, default_value = "sioscope.yml", global = true)]
    config: PathBuf,

    /// WebSocket endpoint, overrides transport.url
    #[arg(short, long, global = true)]
    url: Option<String>,

    /// Line-oriented console on stdin/stdout instead of the TUI
    #[arg(long)]
    headless: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List message builders and their field defaults
    Builders,

    /// Print the payload a builder would send, without connecting
    Preview(PreviewArgs),
}

/// Arguments for the preview subcommand.
#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Builder name (e.g. ChatRoomJoin)
    builder: String,

    /// Field overrides as FIELD=VALUE
    #[arg(value_parser = parse_assignment)]
    overrides: Vec<(String, String)>,
}

/// Error for a malformed `FIELD=VALUE` argument.
#[derive(Debug, thiserror::Error)]
#[error("expected FIELD=VALUE, got {0}")]
struct AssignmentError(String);

fn parse_assignment(arg: &str) -> Result<(String, String), AssignmentError> {
    match arg.split_once('=') {
        Some((field, value)) if !field.is_empty() => Ok((field.to_string(), value.to_string())),
        _ => Err(AssignmentError(arg.to_string())),
    }
}

/// Where log output goes.
enum LogTarget {
    Stderr,
    File(PathBuf),
}

// The console is single-threaded; the transport task shares this thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let found = cli.config.exists();
    let mut config = if found {
        SioscopeConfig::from_file(&cli.config)
            .with_context(|| format!("Failed to load config from {:?}", cli.config))?
    } else {
        SioscopeConfig::default()
    };
    if let Some(url) = cli.url.clone() {
        config.transport.url = url;
    }

    let interactive = cli.command.is_none() && !cli.headless && stdout().is_terminal();
    let target = if interactive {
        LogTarget::File(PathBuf::from(&config.logging.file))
    } else {
        LogTarget::Stderr
    };
    init_logging(&config, cli.verbose, target)?;

    if !found {
        warn!("Config file {:?} not found, using defaults", cli.config);
    }

    let warnings = config.validate().context("Configuration validation failed")?;
    for warning in &warnings {
        eprintln!("{warning}");
    }

    match cli.command {
        Some(Commands::Builders) => {
            builders_command(&config);
            Ok(())
        }
        Some(Commands::Preview(args)) => preview_command(&config, args),
        None => run_console(&config, interactive).await,
    }
}

fn init_logging(config: &SioscopeConfig, verbose: bool, target: LogTarget) -> Result<()> {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::File(path) => {
            // The TUI owns the terminal, so logs go to a file.
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {path:?}"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
    }
    Ok(())
}

fn registry_for(config: &SioscopeConfig) -> BuilderRegistry {
    let mut registry = BuilderRegistry::bundled();
    registry.extend(config.builder_templates());
    registry
}

fn builders_command(config: &SioscopeConfig) {
    let registry = registry_for(config);
    for name in registry.list() {
        let Ok(fields) = registry.fields_of(name) else {
            continue;
        };
        let listed: Vec<String> = fields
            .iter()
            .map(|(field, default)| format!("{field}={default:?}"))
            .collect();
        println!("{name:<16} {}", listed.join(" "));
    }
}

fn preview_command(config: &SioscopeConfig, args: PreviewArgs) -> Result<()> {
    let registry = registry_for(config);
    let overrides: IndexMap<String, String> = args.overrides.into_iter().collect();
    let preview = registry
        .preview(&args.builder, &overrides)
        .with_context(|| format!("Cannot preview {}", args.builder))?;
    println!("{preview}");
    Ok(())
}

async fn run_console(config: &SioscopeConfig, interactive: bool) -> Result<()> {
    let console = Console::from_config(config);
    info!(url = %config.transport.url, "Starting console");

    let (mut handle, transport) = spawn_transport(config.transport.clone());
    console.attach_transport(handle.commands.clone());

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl-C received");
        }
    };

    let result = if interactive {
        let tui = Tui::attach(&console);
        tui.run(&console, &mut handle.events, shutdown).await
    } else {
        let sink = Rc::new(RefCell::new(WriterSink::stdio()));
        let mut presenter = HeadlessPresenter::attach(&console, sink);
        let mut lines = spawn_stdin_reader();
        drive(&console, &mut handle.events, &mut lines, shutdown).await;
        presenter.detach();
        Ok(())
    };

    console.shutdown();
    drop(handle);
    if tokio::time::timeout(Duration::from_secs(2), transport).await.is_err() {
        warn!("Transport did not stop in time");
    }

    result
}
