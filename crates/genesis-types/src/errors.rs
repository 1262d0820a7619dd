//! Error types for Genesis operations.

use std::fmt;
use thiserror::Error;

/// Classified failures the secret store can produce.
///
/// Every store invocation can fail with one of these; the executor aborts
/// the run after reporting the current item, while the validator records
/// the failure and finishes the remaining plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreError {
    /// The store endpoint did not answer at the TCP level
    Unreachable,
    /// The store is reachable but sealed
    Sealed,
    /// The current token/credentials were rejected
    Unauthenticated,
    /// The store has never been initialized
    Uninitialized,
    /// The requested path or key does not exist
    NotFound,
    /// The store answered with something we could not interpret
    Protocol,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unreachable => write!(f, "unreachable"),
            StoreError::Sealed => write!(f, "sealed"),
            StoreError::Unauthenticated => write!(f, "unauthenticated"),
            StoreError::Uninitialized => write!(f, "uninitialized"),
            StoreError::NotFound => write!(f, "not found"),
            StoreError::Protocol => write!(f, "protocol error"),
        }
    }
}

/// Result of probing a secret store with `status()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// Reachable, unsealed, and answering
    Ok,
    /// No TCP connection could be established
    Unreachable,
    /// Reachable but sealed
    Sealed,
    /// Reachable but the credentials were rejected
    Unauthenticated,
    /// Reachable but never initialized
    Uninitialized,
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreStatus::Ok => write!(f, "ok"),
            StoreStatus::Unreachable => write!(f, "unreachable"),
            StoreStatus::Sealed => write!(f, "sealed"),
            StoreStatus::Unauthenticated => write!(f, "unauthenticated"),
            StoreStatus::Uninitialized => write!(f, "uninitialized"),
        }
    }
}

/// The main error type for Genesis operations.
///
/// Parse and resolution failures are normally accumulated into error plans
/// rather than raised, so a whole report can be rendered in one pass; the
/// variants here cover the failures that do stop an operation.
#[derive(Error, Debug)]
pub enum GenesisError {
    /// Malformed kit metadata: wrong YAML shape, unparseable cred-line,
    /// colon in a path or key, unknown type
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Cyclical or ambiguous CA signage
    #[error("Dependency error: {0}")]
    Dependency(String),

    /// A secret store invocation failed
    #[error("Secret store {0}: {1}")]
    Store(StoreError, String),

    /// An invalid secret path filter expression
    #[error("Invalid filter: {0}")]
    BadFilter(String),

    /// The operator declined or aborted an interactive operation
    #[error("Aborted by user")]
    UserAbort,

    /// Interactive operation requested without a controlling terminal
    #[error("Cannot prompt: no controlling terminal")]
    NoTty,

    /// Kit-related error
    #[error("Kit error: {0}")]
    Kit(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl GenesisError {
    /// The store classification, if this is a store failure.
    pub fn store_error(&self) -> Option<StoreError> {
        match self {
            GenesisError::Store(kind, _) => Some(*kind),
            _ => None,
        }
    }
}

/// A specialized Result type for Genesis operations.
pub type Result<T> = std::result::Result<T, GenesisError>;

/// Return early with the named `GenesisError` variant.
///
/// # Example
///
/// ```ignore
/// if size == 0 {
///     bail!(BadRequest, "random length must be a positive integer, got '{}'", token);
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($variant:ident, $msg:expr) => {
        return Err($crate::GenesisError::$variant($msg.to_string()))
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::GenesisError::$variant(format!($fmt, $($arg)*)))
    };
}
