//! Zonal Isolation Detection Engine CLI
//!
//! A command-line tool for synthesizing a service's zonal isolation alarm
//! graph from a topology document and inspecting the result.

mod commands;
mod output;
mod topology;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{explain, names, synth};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Zonal Isolation Detection Engine CLI
#[derive(Parser)]
#[command(name = "azi")]
#[command(author, version, about = "CLI for the Zonal Isolation Detection Engine", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synthesize the alarm graph of a service
    Synth {
        /// Topology document (JSON)
        #[arg(long, short)]
        topology: PathBuf,

        /// Engine configuration file; AZI_* variables override it
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Also write the full JSON report to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show the isolated-impact decision tree of one zone
    Explain {
        /// Topology document (JSON)
        #[arg(long, short)]
        topology: PathBuf,

        /// Engine configuration file; AZI_* variables override it
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Zone identity (e.g. use1-az1) or zone name (e.g. us-east-1a)
        #[arg(long, short)]
        zone: String,
    },

    /// Print the variable name sequence used in expressions
    Names {
        /// Number of names to print
        #[arg(long, short = 'n', default_value_t = 30)]
        count: usize,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output only
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Synth {
            topology,
            config,
            output,
        } => {
            synth::run(&topology, config.as_deref(), output.as_deref(), cli.format)?;
        }
        Commands::Explain {
            topology,
            config,
            zone,
        } => {
            explain::run(&topology, config.as_deref(), &zone, cli.format)?;
        }
        Commands::Names { count } => {
            names::run(count, cli.format)?;
        }
    }

    if cli.metrics {
        output::print_metrics()?;
    }

    Ok(())
}
