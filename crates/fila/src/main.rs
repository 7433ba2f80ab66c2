// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fila - ticket queue management for public-service offices.
//!
//! This is the binary entry point for the Fila server and tooling.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod export;
mod serve;
mod status;

/// Fila - ticket queue management for public-service offices.
#[derive(Parser, Debug)]
#[command(name = "fila", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Fila gateway server.
    Serve,
    /// Show whether a Fila server is running and for how long.
    Status {
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
        /// Disable colors even on a TTY.
        #[arg(long)]
        plain: bool,
    },
    /// Write the ticket report as CSV.
    Export {
        /// Destination file.
        #[arg(long, short)]
        output: PathBuf,
        /// Restrict to a date range: today, week, or month.
        #[arg(long)]
        range: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match fila_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            fila_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::Export { output, range }) => {
            export::run_export(&config, &output, range.as_deref()).await
        }
        None => {
            println!("fila: use --help for available commands");
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
