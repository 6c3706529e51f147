//! Structured error handling for the credrisk pipeline.
//!
//! Every failure in the pipeline falls into one of a small number of
//! categories: bad data, a broken feature-schema contract, storage trouble,
//! or invalid caller input. Handlers return these directly, so the enum also
//! knows how to render itself as an HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the credrisk system
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Data error in field '{field}': {message}")]
    Data { field: String, message: String },

    #[error("Feature schema violation: canonical field '{field}' is absent")]
    Schema { field: String },

    #[error("Persistence failure: {operation} - {message}")]
    Persistence { operation: String, message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Result with RiskError
pub type RiskResult<T> = Result<T, RiskError>;

impl RiskError {
    /// Create a data error naming the offending field
    pub fn data(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Data {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a schema violation for an absent canonical field
    pub fn schema(field: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
        }
    }

    /// Create a persistence failure
    pub fn persistence(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl IntoResponse for RiskError {
    fn into_response(self) -> Response {
        let status = match self {
            RiskError::Validation { .. } => StatusCode::BAD_REQUEST,
            // Everything else is a server-side failure; the message is an
            // operational diagnostic, never a stack trace.
            RiskError::Data { .. }
            | RiskError::Schema { .. }
            | RiskError::Persistence { .. }
            | RiskError::Config { .. }
            | RiskError::Serialization { .. }
            | RiskError::Io { .. }
            | RiskError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

/// Convert from sled errors
impl From<sled::Error> for RiskError {
    fn from(err: sled::Error) -> Self {
        RiskError::persistence("sled_operation", err.to_string())
    }
}

/// Convert from serde_json errors
impl From<serde_json::Error> for RiskError {
    fn from(err: serde_json::Error) -> Self {
        RiskError::serialization("json_operation", err)
    }
}

/// Convert from std::io errors
impl From<std::io::Error> for RiskError {
    fn from(err: std::io::Error) -> Self {
        RiskError::io("io_operation", err)
    }
}

/// Convert from csv errors
impl From<csv::Error> for RiskError {
    fn from(err: csv::Error) -> Self {
        RiskError::data("csv", err.to_string())
    }
}

/// Convert from figment errors
impl From<figment::Error> for RiskError {
    fn from(err: figment::Error) -> Self {
        RiskError::config(err.to_string())
    }
}
