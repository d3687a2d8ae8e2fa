//! qcs - command-line access to Rigetti QCS
//!
//! Lists quantum processors, fetches device metadata and runs a Bell-state
//! check on a QPU or QVM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use qcs_service::api::{QcsApiClient, list_quantum_computers};
use qcs_service::{
    Circuit, ParamResolver, QcsConfig, RigettiQcsService, ServiceOptions, get_rigetti_qcs_service,
};

#[derive(Parser)]
#[command(name = "qcs")]
#[command(author, version, about = "Rigetti QCS command-line client")]
struct Cli {
    /// Settings file (default: ~/.qcs/settings.yaml)
    #[arg(short, long, env = "QCS_SETTINGS_FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List quantum processors
    Processors {
        /// Walk every page and include the QVM variant of each processor
        #[arg(long)]
        all: bool,
    },

    /// Show a processor's instruction set architecture
    Isa {
        /// Quantum processor ID
        id: String,
    },

    /// Show a processor's Quil-T calibrations
    Calibrations {
        /// Quantum processor ID
        id: String,
    },

    /// Run a Bell-state circuit and print the histogram
    Bell {
        /// Quantum processor ID or QVM name (e.g. 9q-square-qvm)
        id: String,

        /// Number of shots
        #[arg(long, default_value = "1000")]
        shots: u32,

        /// Run on a QVM with the processor's topology
        #[arg(long)]
        as_qvm: bool,

        /// Use the generic noise model (generic QVMs only)
        #[arg(long)]
        noisy: bool,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("qcs_service=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = QcsConfig::load(cli.config.as_deref()).context("failed to load settings")?;

    match cli.command {
        Commands::Processors { all } => {
            let client = QcsApiClient::from_config(&config)?;
            if all {
                for name in list_quantum_computers(Some(&client), true, true).await? {
                    println!("{name}");
                }
            } else {
                let response = RigettiQcsService::list_quantum_processors(Some(&client)).await?;
                print_json(&response)?;
            }
        }
        Commands::Isa { id } => {
            let client = QcsApiClient::from_config(&config)?;
            let isa = RigettiQcsService::get_instruction_set_architecture(&id, Some(&client))
                .await
                .with_context(|| format!("failed to fetch ISA for {id}"))?;
            print_json(&isa)?;
        }
        Commands::Calibrations { id } => {
            let client = QcsApiClient::from_config(&config)?;
            let calibrations = RigettiQcsService::get_quilt_calibrations(&id, Some(&client))
                .await
                .with_context(|| format!("failed to fetch calibrations for {id}"))?;
            if let Some(timestamp) = calibrations.settings_timestamp {
                println!("# settings timestamp: {timestamp}");
            }
            println!("{}", calibrations.quilt);
        }
        Commands::Bell {
            id,
            shots,
            as_qvm,
            noisy,
        } => {
            let mut options = ServiceOptions::default().config(config);
            if as_qvm {
                options = options.as_qvm(true);
            }
            if noisy {
                options = options.noisy(true);
            }
            let service = get_rigetti_qcs_service(&id, options)
                .await
                .with_context(|| format!("failed to resolve {id}"))?;

            let bell = Circuit::new().h(0).cnot(0, 1).measure([0, 1], "m");
            let result = service.run(&bell, shots, &ParamResolver::new()).await?;
            let counts = result
                .histogram("m")
                .context("result has no measurements for key m")?;

            println!("{} ({} shots)", service.quantum_computer().name(), shots);
            for (bitstring, count) in counts.sorted() {
                println!("  {bitstring}: {count}");
            }
        }
    }

    Ok(())
}
