//! PostgreSQL Backend
//!
//! Implements the Backend trait over SQLx. One `PostgresBackend` wraps one
//! connection pool for one configured backend; pools are never shared
//! between backends.

use std::time::Instant;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};

use crate::config::{BackendConfig, FederationConfig};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::registry::BackendRegistry;
use crate::engine::traits::Backend;
use crate::engine::types::{ColumnInfo, QueryId, QueryResult, Row as QRow, Value};

/// Probe statement used to validate a freshly opened connection
const TEST_QUERY: &str = "select 1 as test_field";

/// PostgreSQL backend handle
pub struct PostgresBackend {
    name: String,
    pool: PgPool,
}

impl PostgresBackend {
    /// Opens a connection pool for the named backend
    pub async fn connect(name: &str, config: &BackendConfig) -> EngineResult<Self> {
        let conn_str = Self::build_connection_string(config);
        let max_connections = config.pool_max_connections.unwrap_or(5);
        let min_connections = config.pool_min_connections.unwrap_or(0);
        let acquire_timeout = config.pool_acquire_timeout_secs.unwrap_or(30);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(std::time::Duration::from_secs(acquire_timeout as u64))
            .connect(&conn_str)
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("password authentication failed") {
                    EngineError::auth_failed(name, msg)
                } else {
                    EngineError::connection_failed(name, msg)
                }
            })?;

        Ok(Self {
            name: name.to_string(),
            pool,
        })
    }

    /// Builds a connection string from config
    fn build_connection_string(config: &BackendConfig) -> String {
        let ssl_mode = if config.ssl { "require" } else { "disable" };

        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            config.user, config.password, config.host, config.port, config.dbname, ssl_mode
        )
    }

    /// Converts a SQLx row to our universal Row type
    fn convert_row(pg_row: &PgRow) -> QRow {
        let values: Vec<Value> = pg_row
            .columns()
            .iter()
            .map(|col| Self::extract_value(pg_row, col.ordinal()))
            .collect();

        QRow { values }
    }

    /// Extracts a value from a PgRow at the given index
    ///
    /// Tries the common types in turn with `Option<T>` so NULLs decode
    /// gracefully regardless of the declared column type.
    fn extract_value(row: &PgRow, idx: usize) -> Value {
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(Value::Int).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            return v.map(Value::Bool).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return v.map(Value::Float).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            return v.map(|f| Value::Float(f as f64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<Decimal>, _>(idx) {
            return v
                .and_then(|d| d.to_f64())
                .map(Value::Float)
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return v.map(Value::Text).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            return v.map(Value::Bytes).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(idx) {
            return v.map(Value::Json).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
            return v
                .map(|dt| Value::Text(dt.to_rfc3339()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
            return v
                .map(|dt| Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
            return v
                .map(|d| Value::Text(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null);
        }

        Value::Null
    }

    /// Gets column info from a PgRow
    fn get_column_info(row: &PgRow) -> Vec<ColumnInfo> {
        row.columns()
            .iter()
            .map(|col| ColumnInfo {
                name: col.name().to_string(),
                data_type: col.type_info().name().to_string(),
                nullable: true, // Postgres doesn't expose nullability in row metadata
            })
            .collect()
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver_id(&self) -> &'static str {
        "postgres"
    }

    async fn test_connection(&self) -> EngineResult<()> {
        sqlx::query(TEST_QUERY)
            .execute(&self.pool)
            .await
            .map_err(|e| EngineError::query_failed(&self.name, e.to_string()))?;
        Ok(())
    }

    async fn submit(&self, sql: &str) -> EngineResult<QueryResult> {
        let query_id = QueryId::new();
        let start = Instant::now();
        tracing::debug!(backend = %self.name, query_id = %query_id.0, query_len = sql.len(), "submitting query");

        let pg_rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EngineError::query_failed(&self.name, e.to_string()))?;

        let columns = pg_rows
            .first()
            .map(Self::get_column_info)
            .unwrap_or_default();
        let rows: Vec<QRow> = pg_rows.iter().map(Self::convert_row).collect();
        let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracing::debug!(
            backend = %self.name,
            query_id = %query_id.0,
            row_count = rows.len(),
            execution_time_ms,
            "query finished"
        );

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms,
        })
    }
}

/// Connects every configured backend and registers the reachable ones.
///
/// A backend that cannot be reached or fails the probe query is skipped
/// with a logged warning rather than failing the whole bootstrap; callers
/// that require a specific backend will see `BackendNotFound` later.
pub async fn connect_backends(config: &FederationConfig) -> BackendRegistry {
    let mut registry = BackendRegistry::new();

    let mut names: Vec<&String> = config.backends.keys().collect();
    names.sort();

    for name in names {
        let backend_config = &config.backends[name];
        match PostgresBackend::connect(name, backend_config).await {
            Ok(backend) => match backend.test_connection().await {
                Ok(()) => {
                    tracing::info!(backend = %name, host = %backend_config.host, "backend connected");
                    registry.register(std::sync::Arc::new(backend));
                }
                Err(e) => {
                    tracing::warn!(backend = %name, error = %e, "backend probe failed, skipping");
                }
            },
            Err(e) => {
                tracing::warn!(backend = %name, error = %e, "unable to connect to backend, skipping");
            }
        }
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string_building() {
        let config = BackendConfig {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "datacube".to_string(),
            user: "cube_user".to_string(),
            password: "cube_pass".to_string(),
            ssl: false,
            pool_max_connections: None,
            pool_min_connections: None,
            pool_acquire_timeout_secs: None,
        };

        let conn_str = PostgresBackend::build_connection_string(&config);
        assert!(conn_str.contains("localhost:5432"));
        assert!(conn_str.contains("datacube"));
        assert!(conn_str.contains("sslmode=disable"));
    }
}
