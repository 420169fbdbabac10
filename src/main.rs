//! statetab - declarative table-driven state machine interpreter
//!
//! Validates description files and drives events through them, one-shot or
//! interactively.

mod commands;
mod error;
mod repl;
mod scripted;

use clap::{Parser, Subcommand};
use colored::Colorize;
use statetab_runtime::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "statetab")]
#[command(about = "Declarative table-driven finite state machine interpreter")]
#[command(version)]
struct Cli {
    /// Runtime configuration file (YAML)
    #[arg(short, long, env = "STATETAB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a description file and report reachability warnings
    Check {
        /// Description file (.json, .yaml or .yml)
        file: PathBuf,
    },

    /// Start the machine and dispatch events in order
    Run {
        /// Description file (.json, .yaml or .yml)
        file: PathBuf,

        /// Events to dispatch
        events: Vec<String>,

        /// Route events through the asynchronous runner
        #[arg(long = "async")]
        use_async: bool,
    },

    /// Dispatch events interactively
    Repl {
        /// Description file (.json, .yaml or .yml)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "configuration loaded");

    let result = match cli.command {
        Commands::Check { file } => commands::check(&file).map(Some),
        Commands::Run {
            file,
            events,
            use_async,
        } => {
            if use_async {
                commands::run_async(&file, &events, config.runner)
                    .await
                    .map(Some)
            } else {
                commands::run_sync(&file, &events).map(Some)
            }
        }
        Commands::Repl { file } => repl::run(&file).map(|()| None),
    };

    match result {
        Ok(Some(output)) => println!("{}", output),
        Ok(None) => {}
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
