//! Accord launcher
//!
//! Renders agreement documents from templates (or programmatically when no
//! template applies), stores them in the remote document store and moves
//! them between lifecycle folders.

use accord_logging::{init_logging, LogConfig};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

use cli::context::Context;

#[derive(Parser, Debug)]
#[command(name = "accord", about = "Agreement document generation and storage", version)]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.accord/config.toml)
    #[arg(long, global = true, env = "ACCORD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which template a type name resolves to
    Resolve(cli::resolve::ResolveArgs),

    /// Render a document to a local file
    Render(cli::render::RenderArgs),

    /// Render and store a new submission into the pending folder
    Submit(cli::submit::SubmitArgs),

    /// Replace a stored submission after a correction request
    Resubmit(cli::submit::ResubmitArgs),

    /// Move a stored submission to another lifecycle state
    Move(cli::transition::MoveArgs),

    /// Show the effective configuration
    Config(cli::config::ConfigArgs),
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Resolve(args) => args.json,
        Commands::Render(args) => args.json,
        Commands::Submit(args) => args.json,
        Commands::Resubmit(args) => args.json,
        Commands::Move(args) => args.json,
        Commands::Config(args) => args.json,
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let ctx = Context::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Resolve(args) => cli::resolve::run(args, &ctx),
        Commands::Render(args) => cli::render::run(args, &ctx),
        Commands::Submit(args) => cli::submit::run_submit(args, &ctx),
        Commands::Resubmit(args) => cli::submit::run_resubmit(args, &ctx),
        Commands::Move(args) => cli::transition::run(args, &ctx),
        Commands::Config(args) => cli::config::run(args, &ctx),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    let _log_guard = init_logging(LogConfig {
        app_name: "accord",
        verbose: cli.verbose,
        quiet_console: json_mode,
    });

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                eprintln!("{}", serde_json::json!({ "error": format!("{:#}", err) }));
            } else {
                eprintln!("Error: {:#}", err);
            }
            ExitCode::from(1)
        }
    }
}
