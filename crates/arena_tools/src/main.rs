//! Arena Combat - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_tools::simulate::{record_scenario, run_scenario, verify_replay, RunOptions};
use arena_tools::validate::{load_catalog, load_scenario, validate_files};

#[derive(Parser)]
#[command(name = "arena-tools")]
#[command(about = "Development tools for Arena Combat")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Self-test weapon, modifier and scenario data
    Validate {
        /// Weapon catalog
        #[arg(long, default_value = "assets/data/weapons.ron")]
        catalog: PathBuf,

        /// Scenario files to check against the catalog
        scenarios: Vec<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a scenario headless
    Simulate {
        /// Scenario file
        scenario: PathBuf,

        /// Weapon catalog
        #[arg(long, default_value = "assets/data/weapons.ron")]
        catalog: PathBuf,

        /// Ticks to run (defaults to the scenario's)
        #[arg(long)]
        ticks: Option<u64>,

        /// Random seed (defaults to the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Save the run as a replay
        #[arg(long)]
        record: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play back a replay and check its final state hash
    Verify {
        /// Replay file
        replay: PathBuf,
    },
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

fn run(command: Commands) -> arena_tools::Result<()> {
    match command {
        Commands::Validate {
            catalog,
            scenarios,
            json,
        } => {
            tracing::info!("Validating {}", catalog.display());
            let report = validate_files(&catalog, scenarios.as_slice())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for message in &report.messages {
                    println!("{message}");
                }
                println!(
                    "{} infraction(s) in {} case(s)",
                    report.infractions, report.total_cases
                );
            }
            report.into_result()?;
        }
        Commands::Simulate {
            scenario,
            catalog,
            ticks,
            seed,
            record,
            json,
        } => {
            let data = load_scenario(&scenario)?;
            let catalog = load_catalog(&catalog)?;
            let options = RunOptions { ticks, seed };
            let summary = match record {
                Some(path) => record_scenario(&data, catalog, &options, &path)?,
                None => run_scenario(&data, catalog, &options)?.1,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{}: {} ticks, {} shots, {} hits, {:.1} damage, deaths {:?}, hash {:#018x}",
                    summary.scenario,
                    summary.ticks,
                    summary.shots_fired,
                    summary.hits,
                    summary.damage_dealt,
                    summary.deaths,
                    summary.final_state_hash
                );
            }
        }
        Commands::Verify { replay } => {
            let hash = verify_replay(&replay)?;
            println!("Replay OK, final hash {hash:#018x}");
        }
    }
    Ok(())
}
