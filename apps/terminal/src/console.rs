//! # Operator Console
//!
//! Line-oriented front end over the operator commands. One line is one
//! command; the reply is plain text.
//!
//! ```text
//! scan <code>                 add a product by barcode
//! weigh <code> <kg>           add a weighed product, e.g. `weigh 2000001 0.5`
//! add <price> <name...>       add a manually priced line
//! qty <line> <n>              set the quantity of a line
//! rm <line>                   remove a line
//! select <line>               highlight a line
//! discount <amount>           flat discount on the cart
//! clear                       empty the cart
//! hold                        park the cart
//! recall [key]                list parked carts, or bring one back
//! pay <method> [tendered]     cash | card | transfer
//! test-print                  print the diagnostic page
//! devices                     endpoints and session state
//! config [key=value ...]      scanner=, printer=, scanner-baud=, printer-baud=
//! show                        the cart
//! quit
//! ```
//!
//! Lines are numbered from 1 on screen. Amounts are whole minor units;
//! `_` and `,` may be used for grouping (`100_000`).

use tally_core::receipt::StoreProfile;
use tally_core::{Money, SaleRecord, Weight};
use tally_devices::{DeviceConfig, DeviceEndpoint};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::commands;
use crate::error::{CommandError, CommandResult, Outcome};
use crate::state::{CartView, DeviceStatus};
use crate::terminal::Terminal;

const PROMPT: &str = "> ";

// =============================================================================
// Parsing
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Scan { code: String, weight: Option<Weight> },
    Add { name: String, price: Money },
    Quantity { index: usize, quantity: i64 },
    Remove { index: usize },
    Select { index: usize },
    Discount(Money),
    Clear,
    Hold,
    /// `None` lists the held carts.
    Recall(Option<String>),
    Pay { method: String, tendered: Option<Money> },
    TestPrint,
    Devices,
    Config(DevicePatch),
    Show,
    Help,
    Quit,
}

/// Changes to the device configuration typed after `config`.
///
/// The outer `Option` is "leave as is"; `Some(None)` clears the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevicePatch {
    pub scanner: Option<Option<String>>,
    pub printer: Option<Option<String>>,
    pub scanner_baud: Option<u32>,
    pub printer_baud: Option<u32>,
}

impl DevicePatch {
    pub fn is_empty(&self) -> bool {
        *self == DevicePatch::default()
    }

    pub fn apply(self, mut config: DeviceConfig) -> DeviceConfig {
        if let Some(scanner) = self.scanner {
            config.scanner_endpoint = scanner;
        }
        if let Some(printer) = self.printer {
            config.printer_endpoint = printer;
        }
        if let Some(baud) = self.scanner_baud {
            config.scanner_baud = baud;
        }
        if let Some(baud) = self.printer_baud {
            config.printer_baud = baud;
        }
        config
    }
}

/// Parses one console line. Blank lines and `#` comments give `None`.
pub fn parse_line(line: &str) -> CommandResult<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = words.collect();

    let command = match (verb.as_str(), args.as_slice()) {
        ("scan", [code]) => ConsoleCommand::Scan {
            code: code.to_string(),
            weight: None,
        },
        ("weigh", [code, kg]) => ConsoleCommand::Scan {
            code: code.to_string(),
            weight: Some(kg.parse().map_err(|e| CommandError::validation(format!("{}", e)))?),
        },
        ("add", [price, name @ ..]) if !name.is_empty() => ConsoleCommand::Add {
            name: name.join(" "),
            price: parse_money(price)?,
        },
        ("qty", [line, quantity]) => ConsoleCommand::Quantity {
            index: parse_line_number(line)?,
            quantity: quantity
                .parse()
                .map_err(|_| CommandError::validation(format!("'{}' is not a quantity", quantity)))?,
        },
        ("rm", [line]) => ConsoleCommand::Remove {
            index: parse_line_number(line)?,
        },
        ("select", [line]) => ConsoleCommand::Select {
            index: parse_line_number(line)?,
        },
        ("discount", [amount]) => ConsoleCommand::Discount(parse_money(amount)?),
        ("clear", []) => ConsoleCommand::Clear,
        ("hold", []) => ConsoleCommand::Hold,
        ("recall", []) => ConsoleCommand::Recall(None),
        ("recall", [key]) => ConsoleCommand::Recall(Some(key.to_string())),
        ("pay", [method]) => ConsoleCommand::Pay {
            method: method.to_string(),
            tendered: None,
        },
        ("pay", [method, tendered]) => ConsoleCommand::Pay {
            method: method.to_string(),
            tendered: Some(parse_money(tendered)?),
        },
        ("test-print", []) => ConsoleCommand::TestPrint,
        ("devices", []) => ConsoleCommand::Devices,
        ("config", pairs) => ConsoleCommand::Config(parse_patch(pairs)?),
        ("show", []) => ConsoleCommand::Show,
        ("help", _) | ("?", _) => ConsoleCommand::Help,
        ("quit", []) | ("exit", []) => ConsoleCommand::Quit,
        _ => {
            return Err(CommandError::validation(format!(
                "Cannot read '{}' (type 'help' for commands)",
                line
            )))
        }
    };
    Ok(Some(command))
}

fn parse_money(text: &str) -> CommandResult<Money> {
    let digits: String = text.chars().filter(|c| *c != '_' && *c != ',').collect();
    digits
        .parse::<i64>()
        .map(Money::from_minor)
        .map_err(|_| CommandError::validation(format!("'{}' is not an amount", text)))
}

/// On-screen line numbers start at 1.
fn parse_line_number(text: &str) -> CommandResult<usize> {
    match text.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(CommandError::validation(format!("'{}' is not a line number", text))),
    }
}

fn parse_patch(pairs: &[&str]) -> CommandResult<DevicePatch> {
    let mut patch = DevicePatch::default();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| CommandError::validation(format!("Expected key=value, got '{}'", pair)))?;
        let endpoint = match value {
            "" | "-" | "none" => None,
            path => Some(path.to_string()),
        };
        match key {
            "scanner" => patch.scanner = Some(endpoint),
            "printer" => patch.printer = Some(endpoint),
            "scanner-baud" => patch.scanner_baud = Some(parse_baud(value)?),
            "printer-baud" => patch.printer_baud = Some(parse_baud(value)?),
            other => return Err(CommandError::validation(format!("Unknown device setting '{}'", other))),
        }
    }
    Ok(patch)
}

fn parse_baud(text: &str) -> CommandResult<u32> {
    text.parse()
        .map_err(|_| CommandError::validation(format!("'{}' is not a baud rate", text)))
}

// =============================================================================
// Execution
// =============================================================================

/// What the console loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

pub async fn execute(terminal: &Terminal, command: ConsoleCommand) -> CommandResult<Reply> {
    let cart = terminal.cart();
    let profile = &terminal.config().store;

    let text = match command {
        ConsoleCommand::Scan { code, weight } => {
            let outcome = commands::cart::scan_barcode(cart, terminal.catalog(), &code, weight).await?;
            with_warnings(render_cart(&outcome.value, profile), &outcome)
        }
        ConsoleCommand::Add { name, price } => {
            let outcome = commands::cart::add_ad_hoc_item(cart, &name, price).await?;
            with_warnings(render_cart(&outcome.value, profile), &outcome)
        }
        ConsoleCommand::Quantity { index, quantity } => {
            let outcome = commands::cart::set_quantity(cart, index, quantity).await?;
            with_warnings(render_cart(&outcome.value, profile), &outcome)
        }
        ConsoleCommand::Remove { index } => {
            let outcome = commands::cart::remove_item(cart, index).await?;
            with_warnings(render_cart(&outcome.value, profile), &outcome)
        }
        ConsoleCommand::Select { index } => {
            let outcome = commands::cart::select_item(cart, index).await?;
            with_warnings(render_cart(&outcome.value, profile), &outcome)
        }
        ConsoleCommand::Discount(amount) => {
            let outcome = commands::cart::set_discount(cart, amount).await?;
            with_warnings(render_cart(&outcome.value, profile), &outcome)
        }
        ConsoleCommand::Clear => {
            let outcome = commands::cart::clear_cart(cart).await?;
            with_warnings(render_cart(&outcome.value, profile), &outcome)
        }
        ConsoleCommand::Hold => {
            let outcome = commands::cart::hold_cart(cart).await?;
            with_warnings(format!("Held as {}", outcome.value), &outcome)
        }
        ConsoleCommand::Recall(None) => {
            let held = commands::cart::list_held(cart).await?;
            if held.is_empty() {
                "No held carts".to_string()
            } else {
                held.join("\n")
            }
        }
        ConsoleCommand::Recall(Some(key)) => {
            let outcome = commands::cart::recall_cart(cart, &key).await?;
            with_warnings(render_cart(&outcome.value, profile), &outcome)
        }
        ConsoleCommand::Pay { method, tendered } => {
            let outcome = commands::sale::checkout(terminal.checkout(), &method, tendered).await?;
            with_warnings(render_sale(&outcome.value, profile), &outcome)
        }
        ConsoleCommand::TestPrint => {
            let printer = terminal.devices().printer();
            commands::device::test_print(&printer, terminal.receipt()).await?;
            "Test page sent".to_string()
        }
        ConsoleCommand::Devices => {
            let endpoints = commands::device::list_devices(terminal.devices());
            let status = commands::device::device_status(terminal.devices()).await;
            format!("{}\n{}", render_endpoints(&endpoints), render_status(&status))
        }
        ConsoleCommand::Config(patch) if patch.is_empty() => {
            render_config(&terminal.devices().config().await)
        }
        ConsoleCommand::Config(patch) => {
            let config = patch.apply(terminal.devices().config().await);
            let outcome = commands::device::configure_devices(terminal.devices(), config).await?;
            with_warnings(render_status(&outcome.value), &outcome)
        }
        ConsoleCommand::Show => render_cart(&commands::cart::get_cart(cart).await?, profile),
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Text(text))
}

/// Reads commands until `quit` or end of input. Command errors are printed
/// and the loop carries on; only I/O errors end it early.
pub async fn run_console<R, W>(terminal: &Terminal, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output.write_all(PROMPT.as_bytes()).await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        debug!(line = %line, "Console input");
        let reply = match parse_line(&line) {
            Ok(Some(command)) => execute(terminal, command).await,
            Ok(None) => Ok(Reply::Text(String::new())),
            Err(e) => Err(e),
        };

        match reply {
            Ok(Reply::Quit) => break,
            Ok(Reply::Text(text)) if text.is_empty() => {}
            Ok(Reply::Text(text)) => output.write_all(format!("{}\n", text).as_bytes()).await?,
            Err(e) => output.write_all(format!("error: {}\n", e.message).as_bytes()).await?,
        }
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;
    }

    output.flush().await
}

// =============================================================================
// Rendering
// =============================================================================

const HELP: &str = "\
scan <code> | weigh <code> <kg> | add <price> <name>
qty <line> <n> | rm <line> | select <line> | discount <amount>
clear | hold | recall [key] | pay <cash|card|transfer> [tendered]
test-print | devices | config [scanner=|printer=|scanner-baud=|printer-baud=] | show | quit";

fn with_warnings<T>(mut text: String, outcome: &Outcome<T>) -> String {
    for warning in &outcome.warnings {
        text.push_str(&format!("\nwarning: {}", warning));
    }
    text
}

pub fn render_cart(view: &CartView, profile: &StoreProfile) -> String {
    if view.items.is_empty() {
        return "Cart is empty".to_string();
    }

    let mut out = String::new();
    for (i, line) in view.items.iter().enumerate() {
        let marker = if view.selected_index == Some(i) { '>' } else { ' ' };
        out.push_str(&format!(
            "{}{:>2} {:<24} {:>4} x {:>10} {:>14}\n",
            marker,
            i + 1,
            line.display_name,
            line.quantity,
            profile.money(line.unit_price),
            profile.money(line.line_total()),
        ));
    }

    let totals = &view.totals;
    out.push_str(&format!("{:>46} {:>14}\n", "Subtotal", profile.money(totals.subtotal)));
    out.push_str(&format!("{:>46} {:>14}\n", "Tax", profile.money(totals.tax)));
    if totals.discount.is_positive() {
        out.push_str(&format!("{:>46} {:>14}\n", "Discount", profile.money(Money::zero() - totals.discount)));
    }
    out.push_str(&format!("{:>46} {:>14}", "TOTAL", profile.money(totals.total)));
    out
}

fn render_sale(sale: &SaleRecord, profile: &StoreProfile) -> String {
    format!(
        "Sale {} ({})\nTotal {}  Tendered {}  Change {}",
        sale.sale_number(),
        sale.payment_method(),
        profile.money(sale.totals().total),
        profile.money(sale.amount_tendered()),
        profile.money(sale.change()),
    )
}

fn render_endpoints(endpoints: &[DeviceEndpoint]) -> String {
    if endpoints.is_empty() {
        return "No serial devices found".to_string();
    }
    endpoints
        .iter()
        .map(|e| format!("  {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_status(status: &DeviceStatus) -> String {
    let role = |name: &str, endpoint: &Option<String>, state: &str| {
        format!("{:<8} {:<20} {}", name, endpoint.as_deref().unwrap_or("-"), state)
    };
    format!(
        "{}\n{}",
        role("scanner", &status.scanner.endpoint, &status.scanner.state),
        role("printer", &status.printer.endpoint, &status.printer.state),
    )
}

fn render_config(config: &DeviceConfig) -> String {
    format!(
        "scanner={} scanner-baud={}\nprinter={} printer-baud={}",
        config.scanner_endpoint.as_deref().unwrap_or("-"),
        config.scanner_baud,
        config.printer_endpoint.as_deref().unwrap_or("-"),
        config.printer_baud,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TerminalConfig;
    use crate::terminal::Services;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tally_db::{MemoryCatalog, MemoryLedger, MemoryStore};
    use tally_devices::testing::ScriptedOpener;
    use tally_devices::StaticRegistry;

    #[test]
    fn test_parse_cart_commands() {
        assert_eq!(
            parse_line("scan 8991002101234").unwrap(),
            Some(ConsoleCommand::Scan {
                code: "8991002101234".to_string(),
                weight: None
            })
        );
        assert_eq!(
            parse_line("weigh 2000001 0.5").unwrap(),
            Some(ConsoleCommand::Scan {
                code: "2000001".to_string(),
                weight: Some(Weight::from_grams(500))
            })
        );
        assert_eq!(
            parse_line("add 15_000 Gift wrap large").unwrap(),
            Some(ConsoleCommand::Add {
                name: "Gift wrap large".to_string(),
                price: Money::from_minor(15_000)
            })
        );
        assert_eq!(
            parse_line("QTY 2 5").unwrap(),
            Some(ConsoleCommand::Quantity { index: 1, quantity: 5 })
        );
        assert_eq!(parse_line("rm 1").unwrap(), Some(ConsoleCommand::Remove { index: 0 }));
        assert_eq!(parse_line("recall").unwrap(), Some(ConsoleCommand::Recall(None)));
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# note").unwrap(), None);
    }

    #[test]
    fn test_parse_pay() {
        assert_eq!(
            parse_line("pay cash 100,000").unwrap(),
            Some(ConsoleCommand::Pay {
                method: "cash".to_string(),
                tendered: Some(Money::from_minor(100_000))
            })
        );
        assert_eq!(
            parse_line("pay card").unwrap(),
            Some(ConsoleCommand::Pay {
                method: "card".to_string(),
                tendered: None
            })
        );
    }

    #[test]
    fn test_parse_rejects() {
        assert!(parse_line("rm 0").is_err());
        assert!(parse_line("add 5000").is_err());
        assert!(parse_line("pay cash lots").is_err());
        assert!(parse_line("weigh 2000001").is_err());
        assert!(parse_line("fly away").is_err());
        assert!(parse_line("config printer").is_err());
        assert!(parse_line("config speed=fast").is_err());
    }

    #[test]
    fn test_config_patch() {
        let patch = match parse_line("config printer=/dev/ttyUSB1 printer-baud=19200 scanner=-").unwrap() {
            Some(ConsoleCommand::Config(patch)) => patch,
            other => panic!("unexpected {:?}", other),
        };

        let before = DeviceConfig {
            scanner_endpoint: Some("/dev/ttyACM0".to_string()),
            ..DeviceConfig::default()
        };
        let after = patch.apply(before);
        assert_eq!(after.scanner_endpoint, None);
        assert_eq!(after.printer_endpoint.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(after.printer_baud, 19_200);
        assert_eq!(after.scanner_baud, 9_600);

        assert_eq!(
            parse_line("config").unwrap(),
            Some(ConsoleCommand::Config(DevicePatch::default()))
        );
    }

    fn terminal() -> Terminal {
        let (terminal, _barcodes) = Terminal::new(
            TerminalConfig {
                tax_rate_bps: 0,
                ..TerminalConfig::default()
            },
            Services {
                store: Arc::new(MemoryStore::new()),
                catalog: Arc::new(MemoryCatalog::new()),
                ledger: Arc::new(MemoryLedger::new()),
                opener: Arc::new(ScriptedOpener::new()),
                registry: Arc::new(StaticRegistry(Vec::new())),
            },
        );
        terminal
    }

    #[tokio::test]
    async fn test_console_session() {
        let terminal = terminal();
        let input: &[u8] = b"add 5000 Gift wrap\nqty 1 3\nbogus\npay cash 20000\nshow\nquit\nshow\n";
        let mut output = Vec::new();

        run_console(&terminal, input, &mut output).await.unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("Gift wrap"));
        assert!(text.contains("error: Cannot read 'bogus'"));
        assert!(text.contains("Change Rp 5.000"));
        // No printer connected: the sale stands, the receipt is reported
        assert!(text.contains("warning: receipt not printed"));
        assert!(text.contains("Cart is empty"));
        // Nothing after quit runs
        assert_eq!(text.matches("Cart is empty").count(), 1);
    }

    #[tokio::test]
    async fn test_hold_and_recall_through_console() {
        let terminal = terminal();
        execute(&terminal, parse_line("add 1000 Bag").unwrap().unwrap()).await.unwrap();

        let held = match execute(&terminal, ConsoleCommand::Hold).await.unwrap() {
            Reply::Text(text) => text,
            Reply::Quit => panic!("hold quit the console"),
        };
        let key = held.trim_start_matches("Held as ").to_string();
        assert!(key.starts_with("held:"));

        let listed = execute(&terminal, ConsoleCommand::Recall(None)).await.unwrap();
        assert_eq!(listed, Reply::Text(key.clone()));

        let recalled = execute(&terminal, ConsoleCommand::Recall(Some(key))).await.unwrap();
        match recalled {
            Reply::Text(text) => assert!(text.contains("Bag")),
            Reply::Quit => panic!("recall quit the console"),
        }
    }

    #[test]
    fn test_render_cart_marks_selection() {
        let profile = StoreProfile::default();
        let mut cart = tally_core::Cart::new();
        cart.add_ad_hoc_item("Bag", Money::from_minor(1_000)).unwrap();
        cart.add_ad_hoc_item("Box", Money::from_minor(2_000)).unwrap();
        cart.select(1).unwrap();

        let view = CartView {
            items: cart.items().to_vec(),
            selected_index: cart.selected_index(),
            totals: tally_core::pricing::compute_for(&cart, tally_core::TaxRate::zero()).unwrap(),
        };
        let text = render_cart(&view, &profile);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("  1 Bag"));
        assert!(lines[1].starts_with("> 2 Box"));
        assert!(lines.last().unwrap().ends_with("Rp 3.000"));
    }
}
