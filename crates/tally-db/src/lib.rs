//! # tally-db: Persistence Layer for Tally POS
//!
//! The terminal's three external collaborators (key-value store, product
//! catalog, sales ledger) as traits, with SQLite implementations and
//! in-memory doubles.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartStore ───────────► KeyValueStore  (cart_snapshot, held:*, config)  │
//! │  Scanner event ───────► Catalog        (barcode → Product)              │
//! │  CheckoutController ──► SaleSink       (append SaleRecord)              │
//! │                              │                                          │
//! │  ┌───────────────────────────▼─────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                        │   │
//! │  │   store.rs        traits + MemoryStore/MemoryCatalog/MemoryLedger│   │
//! │  │   repository/     KvRepository, ProductRepository,               │   │
//! │  │                   SaleLedgerRepository                           │   │
//! │  │   pool.rs         Database, DbConfig (WAL, migrations)           │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Catalog, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let product = db.products().resolve_by_barcode("8991002101234").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::kv::KvRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleLedgerRepository;
pub use store::{Catalog, KeyValueStore, MemoryCatalog, MemoryLedger, MemoryStore, SaleSink};
