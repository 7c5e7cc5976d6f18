// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the federation engine
//!
//! Driver-specific failures are mapped onto these unified variants so the
//! schema and query layers see consistent errors regardless of which
//! backend produced them.

use thiserror::Error;

/// Unified error type for all federation engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("connection to backend '{backend}' failed: {message}")]
    ConnectionFailed { backend: String, message: String },

    #[error("authentication to backend '{backend}' failed: {message}")]
    AuthenticationFailed { backend: String, message: String },

    #[error("query on backend '{backend}' failed: {message}")]
    QueryFailed { backend: String, message: String },

    #[error("backend not found: {backend}")]
    BackendNotFound { backend: String },

    #[error("dimension '{dimension}' is not a dimension of {scope}")]
    InvalidDimension { dimension: String, scope: String },

    #[error("empty range for dimension '{dimension}': min {min} is greater than max {max}")]
    EmptyRange {
        dimension: String,
        min: f64,
        max: f64,
    },

    #[error("missing or null column '{column}' in result row")]
    MissingColumn { column: String },

    #[error("federated call failed on backend '{backend}'")]
    Federation {
        backend: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn connection_failed(backend: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            backend: backend.into(),
            message: msg.into(),
        }
    }

    pub fn auth_failed(backend: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            backend: backend.into(),
            message: msg.into(),
        }
    }

    pub fn query_failed(backend: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::QueryFailed {
            backend: backend.into(),
            message: msg.into(),
        }
    }

    pub fn backend_not_found(backend: impl Into<String>) -> Self {
        Self::BackendNotFound {
            backend: backend.into(),
        }
    }

    pub fn invalid_dimension(dimension: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::InvalidDimension {
            dimension: dimension.into(),
            scope: scope.into(),
        }
    }

    pub fn empty_range(dimension: impl Into<String>, min: f64, max: f64) -> Self {
        Self::EmptyRange {
            dimension: dimension.into(),
            min,
            max,
        }
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    pub fn federation(backend: impl Into<String>, source: EngineError) -> Self {
        Self::Federation {
            backend: backend.into(),
            source: Box::new(source),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
