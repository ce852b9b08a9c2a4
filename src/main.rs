// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! universal - SSR host driver for universal-module
//!
//! Renders a module manifest the way a server render would and prints the
//! module ids and chunk names the response has to ship.

mod render;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use universal_module::{LoaderConfig, VERSION};

#[derive(Parser)]
#[command(
    name = "universal",
    about = "Render a module manifest and flush the chunks it used",
    version = VERSION,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Loader defaults (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the async timeout in milliseconds (0 disables it)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a manifest and print the flushed usage report
    Render {
        /// Manifest file
        manifest: PathBuf,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },
    /// Print the effective loader configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("universal=debug,universal_module=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("universal=warn,universal_module=warn")
            .with_writer(std::io::stderr)
            .init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = LoaderConfig::load(cli.config.as_deref())?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }

    match cli.command {
        Command::Render { manifest, pretty } => {
            let manifest = render::Manifest::from_file(&manifest)?;
            let report = render::render(&manifest, &config).await?;

            let output = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{}", output);

            if !report.errors.is_empty() {
                eprintln!(
                    "{}: {} render entr{} failed",
                    "Warning".yellow().bold(),
                    report.errors.len(),
                    if report.errors.len() == 1 { "y" } else { "ies" }
                );
            }
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
