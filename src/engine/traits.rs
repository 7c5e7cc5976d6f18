//! Backend trait definition
//!
//! This is the core abstraction over one named relational backend. Each
//! driver implements this trait to expose the read-only query primitive
//! the federation layer is built on: submit a statement, get back the
//! materialized result rows.

use async_trait::async_trait;

use crate::engine::error::EngineResult;
use crate::engine::types::QueryResult;

/// A connected, named backend participating in federation
///
/// Implementations are expected to be already connected (or pooled) and
/// to auto-commit; the federation layer never opens transactions.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the configured backend name (the federation key, e.g. "agdc_v1")
    fn name(&self) -> &str;

    /// Returns the unique identifier for the driver (e.g. "postgres")
    fn driver_id(&self) -> &'static str;

    /// Probes the backend with a trivial query
    ///
    /// Use this to validate a connection before registering the backend.
    async fn test_connection(&self) -> EngineResult<()>;

    /// Executes a read query and returns the materialized result
    async fn submit(&self, sql: &str) -> EngineResult<QueryResult>;
}
