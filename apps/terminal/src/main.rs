//! # Tally Terminal Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Run the checkout console (default)
//! tally-terminal
//! tally-terminal run
//!
//! # List serial endpoints a scanner or printer could use
//! tally-terminal devices
//!
//! # Print the diagnostic page on the configured printer, or on a given one
//! tally-terminal test-print
//! tally-terminal test-print --device /dev/ttyUSB0 --baud 19200
//! ```
//!
//! Configuration comes from `config.toml` in the platform config directory
//! (or `TALLY_CONFIG`), with `TALLY_*` environment overrides.

use clap::{Parser, Subcommand};

use tally_terminal::error::AppError;
use tally_terminal::state::TerminalConfig;

/// Tally POS - checkout terminal
#[derive(Parser, Debug)]
#[command(name = "tally-terminal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the checkout console
    Run,

    /// List serial endpoints
    Devices,

    /// Print the diagnostic page
    TestPrint {
        /// Printer device path (defaults to the configured printer)
        #[arg(long, value_name = "PATH")]
        device: Option<String>,

        /// Baud rate (defaults to the configured rate, or 9600)
        #[arg(long)]
        baud: Option<u32>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    tally_terminal::init_tracing();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = TerminalConfig::load()?;
            tally_terminal::run(config).await
        }
        Commands::Devices => {
            let endpoints = tally_terminal::list_devices();
            if endpoints.is_empty() {
                println!("No serial devices found");
            }
            for endpoint in endpoints {
                println!("{}", endpoint);
            }
            Ok(())
        }
        Commands::TestPrint { device, baud } => {
            let config = TerminalConfig::load()?;
            tally_terminal::test_print(&config, device, baud).await?;
            println!("✓ Test page sent");
            Ok(())
        }
    }
}
