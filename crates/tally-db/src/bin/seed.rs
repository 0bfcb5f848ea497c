//! # Demo Catalog Seeder
//!
//! Populates a database with a small catalog for trying the terminal.
//!
//! ## Usage
//! ```bash
//! cargo run -p tally-db --bin seed
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db --stock 50
//! ```
//!
//! Weighed products (fruit, rice by the kilo) carry a price per kilogram and
//! use internal `20xxxxx` barcodes.

use clap::Parser;
use tally_core::{Money, Product};
use tally_db::{Database, DbConfig};

/// (id, barcode, name, price, sold_by_weight)
const CATALOG: &[(&str, &str, &str, i64, bool)] = &[
    ("p-teh-botol", "8991002101234", "Teh Botol Sosro 450ml", 3_500, false),
    ("p-aqua-600", "8886008101053", "Aqua 600ml", 3_000, false),
    ("p-indomie-goreng", "089686010947", "Indomie Goreng", 3_100, false),
    ("p-roti-tawar", "8992761111113", "Roti Tawar Kupas", 16_500, false),
    ("p-susu-uht", "8992753720108", "Susu UHT Coklat 250ml", 6_200, false),
    ("p-kopi-sachet", "8998989100120", "Kopi Sachet 20g", 1_500, false),
    ("p-gula-1kg", "8993093665018", "Gula Pasir 1kg", 17_000, false),
    ("p-sabun", "8999999036652", "Sabun Mandi 85g", 4_800, false),
    ("p-apel-fuji", "2000001", "Apel Fuji", 42_000, true),
    ("p-pisang", "2000002", "Pisang Cavendish", 18_000, true),
    ("p-beras", "2000003", "Beras Curah", 13_500, true),
];

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Tally POS demo catalog seeder")]
struct Args {
    /// Database file path
    #[arg(short, long, default_value = "./tally_dev.db")]
    db: String,

    /// Stock on hand for every unit-priced product
    #[arg(short, long, default_value_t = 24)]
    stock: i64,

    /// Overwrite products that already exist
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Tally POS demo catalog");
    println!("======================");
    println!("Database: {}", args.db);
    println!();

    let db = Database::new(DbConfig::new(&args.db)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 && !args.force {
        println!("⚠ Database already has {} products", existing);
        println!("  Pass --force to overwrite them.");
        return Ok(());
    }

    let repo = db.products();
    for (id, barcode, name, price, sold_by_weight) in CATALOG {
        let product = Product {
            id: id.to_string(),
            barcode: barcode.to_string(),
            name: name.to_string(),
            unit_price: Money::from_minor(*price),
            stock_on_hand: if *sold_by_weight { 0 } else { args.stock },
            sold_by_weight: *sold_by_weight,
        };
        repo.upsert(&product).await?;
        println!(
            "  {:<15} {:<24} {:>8}{}",
            barcode,
            name,
            price,
            if *sold_by_weight { " /kg" } else { "" }
        );
    }

    println!();
    println!("✓ {} products written", CATALOG.len());
    db.close().await;
    Ok(())
}
