//! # Tally Terminal Library
//!
//! The checkout terminal: one owned [`Terminal`] context, the operator
//! commands over it, and a line console for driving it from a keyboard.
//!
//! ## Module Organization
//! ```text
//! tally_terminal/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── terminal.rs     ◄─── Terminal context + scanner forwarding
//! ├── checkout.rs     ◄─── CheckoutController (sale → ledger → receipt)
//! ├── console.rs      ◄─── stdin command parser and text rendering
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── cart.rs     ◄─── CartStore (live cart, snapshot, held carts)
//! │   ├── devices.rs  ◄─── DeviceManager (scanner/printer sessions)
//! │   └── config.rs   ◄─── TerminalConfig (TOML + TALLY_* env)
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── cart.rs     ◄─── Cart manipulation commands
//! │   ├── sale.rs     ◄─── Checkout command
//! │   └── device.rs   ◄─── Device listing, configuration, test print
//! └── error.rs        ◄─── CommandError, warnings, startup errors
//! ```

pub mod checkout;
pub mod commands;
pub mod console;
pub mod error;
pub mod state;
pub mod terminal;

use std::sync::Arc;
use tally_db::{Database, DbConfig, KeyValueStore};
use tally_devices::{
    DeviceConfig, DeviceEndpoint, DeviceRegistry, PrinterChannel, SysfsRegistry, TtyOpener,
    DEVICE_CONFIG_KEY,
};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use checkout::ReceiptSettings;
use error::{AppError, CommandError};
use state::TerminalConfig;
use terminal::{Services, Terminal};

pub use terminal::spawn_scan_forwarder;

/// Runs the terminal until the operator quits or stdin closes.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Open Database ────────────────────────────────────────────────────► │
/// │     • configured path, or tally.db in the platform data directory       │
/// │     • SQLite with WAL mode, pending migrations applied                  │
/// │                                                                         │
/// │  2. Build Terminal ───────────────────────────────────────────────────► │
/// │     • KvRepository, ProductRepository, SaleLedgerRepository             │
/// │     • sysfs registry, tty opener                                        │
/// │                                                                         │
/// │  3. Start ────────────────────────────────────────────────────────────► │
/// │     • restore cart snapshot                                             │
/// │     • connect devices from `device_config`                              │
/// │     • forward scanner barcodes into the cart                            │
/// │                                                                         │
/// │  4. Console ──────────────────────────────────────────────────────────► │
/// │     • one command per stdin line until `quit` or EOF                    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(config: TerminalConfig) -> Result<(), AppError> {
    info!("Starting Tally POS terminal");

    let db_path = config.database_path()?;
    info!(path = %db_path.display(), "Database path determined");
    let db = Database::new(DbConfig::new(db_path)).await?;

    let (terminal, barcodes) = Terminal::new(
        config,
        Services {
            store: Arc::new(db.kv()),
            catalog: Arc::new(db.products()),
            ledger: Arc::new(db.sales()),
            opener: Arc::new(TtyOpener),
            registry: Arc::new(SysfsRegistry::default()),
        },
    );
    let terminal = Arc::new(terminal);

    for warning in terminal.start().await {
        warn!(%warning, "Startup warning");
    }
    let forwarder = spawn_scan_forwarder(terminal.clone(), barcodes);

    let result = console::run_console(
        &terminal,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    forwarder.abort();
    terminal.shutdown().await;
    db.close().await;

    result.map_err(AppError::from)
}

/// Serial endpoints visible to the terminal.
pub fn list_devices() -> Vec<DeviceEndpoint> {
    SysfsRegistry::default().list_endpoints()
}

/// Prints the diagnostic page once, outside the console.
///
/// Without `device` the printer stored in `device_config` is used, which
/// means opening the database.
pub async fn test_print(config: &TerminalConfig, device: Option<String>, baud: Option<u32>) -> Result<(), AppError> {
    let stored = match device {
        Some(_) => DeviceConfig::default(),
        None => stored_device_config(config).await?,
    };
    let printer_config = DeviceConfig {
        printer_endpoint: device.or(stored.printer_endpoint),
        printer_baud: baud.unwrap_or(stored.printer_baud),
        ..DeviceConfig::default()
    };
    printer_config.validate()?;

    let path = printer_config
        .printer_endpoint
        .ok_or_else(|| CommandError::validation("No printer configured; pass --device"))?;

    let printer = PrinterChannel::new(Arc::new(TtyOpener));
    printer
        .connect(&DeviceEndpoint::from_path(path), printer_config.printer_baud)
        .await?;

    let receipt = ReceiptSettings {
        profile: config.store.clone(),
        target: config.receipt_target,
        cashier: config.cashier.clone(),
    };
    let result = commands::device::test_print(&printer, &receipt).await;
    printer.disconnect().await;
    Ok(result?)
}

async fn stored_device_config(config: &TerminalConfig) -> Result<DeviceConfig, AppError> {
    let db = Database::new(DbConfig::new(config.database_path()?)).await?;
    let json = db.kv().get(DEVICE_CONFIG_KEY).await;
    db.close().await;

    match json? {
        Some(json) => Ok(DeviceConfig::from_json(&json)?),
        None => Ok(DeviceConfig::default()),
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally_devices=trace` - Trace the device channels only
/// - Default: INFO, DEBUG for the tally crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
