//! Attendance CLI - record and inspect attendance decisions
//!
//! # Usage
//!
//! ```bash
//! # Submit attendance as seen through a reverse proxy
//! attendance submit --identity U002 --name "Ana" --forwarded-for "203.0.113.9, 10.0.0.1"
//!
//! # Manage expected addresses
//! attendance expected set U002 203.0.113.9
//! attendance expected get U002
//! attendance expected list
//!
//! # Reports
//! attendance report
//! attendance report --identity U002 --output-format json
//!
//! # Configuration
//! attendance config show
//! attendance config validate
//! ```

mod commands;
mod context;
mod output;

use clap::{Parser, Subcommand};
use commands::{
    config::ConfigCommand, expected::ExpectedCommand, report::ReportArgs, submit::SubmitArgs,
};
use context::CliContext;
use output::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "attendance")]
#[command(version)]
#[command(about = "Address-based attendance decisions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "ATTENDANCE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (table, json, plain)
    #[arg(short, long, global = true, default_value = "table")]
    output_format: String,

    /// Suppress status messages
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an attendance request
    Submit(SubmitArgs),

    /// Expected address management
    Expected {
        #[command(subcommand)]
        command: ExpectedCommand,
    },

    /// Show recorded attendance
    Report(ReportArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

fn init_tracing(default_filter: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("attendance=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let output_format: OutputFormat = cli.output_format.parse().unwrap_or_else(|e| {
        eprintln!("Warning: {}. Using table format.", e);
        OutputFormat::Table
    });

    let mut ctx = match cli.config {
        Some(path) => match CliContext::new(path) {
            Ok(ctx) => ctx,
            Err(e) => {
                eprintln!("Error loading configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => match CliContext::with_defaults() {
            Ok(ctx) => ctx,
            Err(e) => {
                eprintln!("Error initializing context: {}", e);
                std::process::exit(1);
            }
        },
    };

    ctx.output_format = output_format;
    ctx.quiet = cli.quiet;
    init_tracing(&ctx.config.log_filter, cli.verbose);

    if let Some(path) = &ctx.config_path {
        ctx.status(&format!("Using configuration {}", path.display()));
    }

    let result = match cli.command {
        Commands::Submit(args) => commands::submit::execute(&mut ctx, args).await,
        Commands::Expected { command } => commands::expected::execute(&mut ctx, command).await,
        Commands::Report(args) => commands::report::execute(&mut ctx, args).await,
        Commands::Config { command } => commands::config::execute(&ctx, command).await,
    };

    if let Err(e) = result {
        ctx.formatter().error(&e.to_string());
        std::process::exit(1);
    }
}
