//! # Command Error Type
//!
//! Unified error type for operator commands, plus the non-fatal warnings a
//! successful command can carry.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally POS                              │
//! │                                                                         │
//! │  Command Function                                                       │
//! │  Result<Outcome<T>, CommandError>                                       │
//! │         │                                                               │
//! │         ├── CoreError (validation, stock, payment) ──► CommandError     │
//! │         │        operation did not apply                                │
//! │         │                                                               │
//! │         ├── DbError / DeviceError ───────────────────► CommandError     │
//! │         │                                                               │
//! │         └── Ok(Outcome { value, warnings })                             │
//! │                  │                                                      │
//! │                  ├── Warning::Persistence  snapshot not saved           │
//! │                  └── Warning::PrintFailed  sale committed, no receipt   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Warnings never undo the operation that produced them.

use serde::Serialize;
use std::fmt;
use tally_core::CoreError;
use tally_db::DbError;
use tally_devices::DeviceError;
use thiserror::Error;

use crate::state::ConfigError;

/// Error returned from operator commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "STOCK_ERROR",
///   "message": "Out of stock for Teh Botol: 3 available, 4 requested"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Barcode or held cart not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Quantity would exceed the stock ceiling
    StockError,

    /// Payment does not cover the total
    PaymentError,

    /// Cart operation failed (bad index, empty, full)
    CartError,

    /// Scanner or printer failure
    DeviceError,

    /// Persistence operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

pub type CommandResult<T> = Result<T, CommandError>;

impl CommandError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CommandError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        CommandError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CommandError::new(ErrorCode::ValidationError, message)
    }

    pub fn cart(message: impl Into<String>) -> Self {
        CommandError::new(ErrorCode::CartError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CommandError::new(ErrorCode::Internal, message)
    }
}

impl From<CoreError> for CommandError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::OutOfStock { .. } => ErrorCode::StockError,
            CoreError::InsufficientPayment { .. } => ErrorCode::PaymentError,
            CoreError::InvalidIndex { .. } | CoreError::EmptyCart | CoreError::CartFull { .. } => {
                ErrorCode::CartError
            }
            CoreError::InvalidQuantity(_)
            | CoreError::InvalidDiscount { .. }
            | CoreError::WeightRequired(_)
            | CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        CommandError::new(code, err.to_string())
    }
}

impl From<tally_core::ValidationError> for CommandError {
    fn from(err: tally_core::ValidationError) -> Self {
        CommandError::validation(err.to_string())
    }
}

impl From<DbError> for CommandError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CommandError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => CommandError::new(
                ErrorCode::DatabaseError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Unavailable(reason) => CommandError::new(
                ErrorCode::DatabaseError,
                format!("Store unavailable: {}", reason),
            ),
            other => {
                // Log the actual error but return a generic message
                tracing::error!(error = %other, "Database operation failed");
                CommandError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<DeviceError> for CommandError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::InvalidConfig(reason) => CommandError::validation(reason),
            other => CommandError::new(ErrorCode::DeviceError, other.to_string()),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

// =============================================================================
// Startup Errors
// =============================================================================

/// Failure that stops the terminal binary before or outside the console.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("{0}")]
    Command(#[from] CommandError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Warnings
// =============================================================================

/// Non-fatal problem attached to a successful command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Warning {
    /// A best-effort store write failed; the in-memory change stands.
    Persistence(String),

    /// The receipt did not print; the sale is committed.
    PrintFailed(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Persistence(reason) => write!(f, "not saved: {}", reason),
            Warning::PrintFailed(reason) => write!(f, "receipt not printed: {}", reason),
        }
    }
}

/// A successful result plus any warnings raised on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Outcome {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Outcome { value, warnings }
    }

    pub fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}
