//! Error types for the token storage adapter.
//!
//! Two layers exist: [`StoreError`] describes a failure of the backing
//! key-value store itself, and [`AdapterError`] is what adapter operations
//! return to the protocol engine. Store failures are wrapped without
//! modification and never retried.

use std::fmt;

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or a connection could not be obtained.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// The backend rejected or failed a command.
    #[error("Command error: {message}")]
    Command {
        /// Description of the command failure.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Command` error.
    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Errors returned by adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// No backing store connection is configured.
    #[error("Store unavailable: no backing store connection is configured")]
    StoreUnavailable,

    /// Stored data could not be decoded.
    #[error("Decode error for key {key}: {message}")]
    Decode {
        /// The key whose contents failed to decode.
        key: String,
        /// Description of the decoding failure.
        message: String,
    },

    /// The caller violated the adapter contract.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of the violation.
        message: String,
    },

    /// The adapter configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdapterError {
    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidOperation` error.
    #[must_use]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the adapter has no backing store.
    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }

    /// Returns `true` if this is a decode error.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Returns `true` if this is an invalid operation error.
    #[must_use]
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::StoreUnavailable => ErrorCategory::Unavailable,
            Self::Decode { .. } => ErrorCategory::Corruption,
            Self::InvalidOperation { .. } => ErrorCategory::Contract,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Store(_) => ErrorCategory::Infrastructure,
        }
    }
}

/// Categories of adapter errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// No store configured.
    Unavailable,
    /// Stored bytes are not a valid payload.
    Corruption,
    /// Caller contract violation.
    Contract,
    /// Invalid configuration.
    Configuration,
    /// Backing store failure.
    Infrastructure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "unavailable"),
            Self::Corruption => write!(f, "corruption"),
            Self::Contract => write!(f, "contract"),
            Self::Configuration => write!(f, "configuration"),
            Self::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AdapterError::decode("AccessToken:abc", "expected value at line 1 column 1");
        assert_eq!(
            err.to_string(),
            "Decode error for key AccessToken:abc: expected value at line 1 column 1"
        );

        let err = AdapterError::invalid_operation("AccessToken is not consumable");
        assert_eq!(
            err.to_string(),
            "Invalid operation: AccessToken is not consumable"
        );

        let err: AdapterError = StoreError::connection("refused").into();
        assert_eq!(err.to_string(), "Connection error: refused");
    }

    #[test]
    fn test_error_predicates() {
        assert!(AdapterError::StoreUnavailable.is_store_unavailable());
        assert!(AdapterError::decode("k", "m").is_decode());
        assert!(AdapterError::invalid_operation("m").is_invalid_operation());
        assert!(!AdapterError::StoreUnavailable.is_decode());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AdapterError::StoreUnavailable.category(),
            ErrorCategory::Unavailable
        );
        assert_eq!(
            AdapterError::from(StoreError::command("WRONGTYPE")).category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Corruption.to_string(), "corruption");
    }
}
