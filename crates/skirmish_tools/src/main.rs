//! Skirmish - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use skirmish_core::threat::ThreatMethod;
use skirmish_tools::scan::{run_scan, ScanOptions};
use skirmish_tools::validate::validate_catalog_str;
use skirmish_tools::{read_text, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "skirmish-tools")]
#[command(about = "Development tools for the skirmish targeting core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a catalog file
    Validate {
        /// Path to the catalog RON
        #[arg(default_value = "data/catalog.ron")]
        catalog: PathBuf,
    },
    /// Report every armed object's greatest threat in a scenario
    Scan {
        /// Path to the catalog RON
        catalog: PathBuf,
        /// Path to the scenario RON
        scenario: PathBuf,
        /// Comma-separated method tags, e.g. "area,ground"
        #[arg(long, value_delimiter = ',')]
        method: Vec<String>,
        /// Ticks to simulate before scanning
        #[arg(long, default_value_t = 0)]
        ticks: u64,
        /// Simulation seed
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Validate { catalog } => {
            tracing::info!("Validating catalog: {}", catalog.display());
            let report = validate_catalog_str(&read_text(&catalog)?)?;
            for warning in &report.warnings {
                tracing::warn!("{warning}");
            }
            tracing::info!("Validation passed: {report}");
        }
        Commands::Scan {
            catalog,
            scenario,
            method,
            ticks,
            seed,
            json,
        } => {
            let options = ScanOptions {
                method: (!method.is_empty()).then(|| ThreatMethod::from_tags(&method)),
                ticks,
                seed,
            };
            let summary = run_scan(&read_text(&catalog)?, &read_text(&scenario)?, &options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary.to_table());
            }
        }
    }
    Ok(())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
