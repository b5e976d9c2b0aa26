//! Error types for the ODBC cursor layer.

use thiserror::Error;

/// Result type alias for cursor and connection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cursor and connection operations.
///
/// The first three variants mirror the database-API error classes a driver
/// diagnostic is translated into. The remaining ones are raised locally, before
/// any driver call is made.
#[derive(Error, Debug)]
pub enum Error {
    /// Misuse of the API or a statement the data source rejected
    /// (SQL state class `42`).
    #[error("{message}")]
    Programming {
        message: String,
        sqlstate: Option<String>,
    },

    /// A value could not be represented or converted (SQL state class `22`).
    #[error("{message}")]
    Data {
        message: String,
        sqlstate: Option<String>,
    },

    /// Any other failure reported by the driver layer.
    #[error("{message}")]
    Database {
        message: String,
        sqlstate: Option<String>,
    },

    /// Buffers or bindings handed out by the driver layer do not match what the
    /// cursor requested.
    #[error("Interface error: {message}")]
    Interface { message: String },

    /// Row-array size must be strictly positive.
    #[error("arraysize must be an integer > 0, got {value}")]
    InvalidArraySize { value: i64 },

    /// Row-array size must be an integer.
    #[error("arraysize must be an integer > 0, got a value of type {found}")]
    ArraySizeType { found: &'static str },

    /// Requested feature is not implemented by this layer.
    #[error("{feature} is not supported")]
    NotSupported { feature: &'static str },
}

impl Error {
    /// Create a programming error without a SQL state.
    pub fn programming(message: impl Into<String>) -> Self {
        Self::Programming {
            message: message.into(),
            sqlstate: None,
        }
    }

    /// Create a data error without a SQL state.
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
            sqlstate: None,
        }
    }

    /// Create a database error without a SQL state.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            sqlstate: None,
        }
    }

    /// Create an interface error.
    pub fn interface(message: impl Into<String>) -> Self {
        Self::Interface {
            message: message.into(),
        }
    }

    /// SQL state reported by the driver, if this error came from a diagnostic record.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Programming { sqlstate, .. }
            | Error::Data { sqlstate, .. }
            | Error::Database { sqlstate, .. } => sqlstate.as_deref(),
            _ => None,
        }
    }

    /// Whether this error belongs to the database-error family
    /// (programming, data or generic database error).
    pub fn is_database_error(&self) -> bool {
        matches!(
            self,
            Error::Programming { .. } | Error::Data { .. } | Error::Database { .. }
        )
    }
}
