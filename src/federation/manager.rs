// SPDX-License-Identifier: Apache-2.0

//! Federation manager
//!
//! Owns the backend registry and the per-backend schema cache, and
//! exposes the public federated operations: schema discovery and tile
//! range queries. Schemas are discovered once at startup, cached
//! read-only, and rebuildable on demand via `discover_schema`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::instrument;

use crate::config::FederationConfig;
use crate::engine::drivers::postgres::connect_backends;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::registry::BackendRegistry;
use crate::engine::traits::Backend;
use crate::federation::runner::run_all;
use crate::query::synthesizer::{synthesize_tile_query, DimensionRange};
use crate::query::tile_index::{build_tile_index, TileIndex};
use crate::schema::builder::discover_backend_schema;
use crate::schema::model::DatabaseSchema;

/// Tile indexes keyed by ndarray type tag, keyed by backend name
pub type FederatedTileMap = HashMap<String, HashMap<String, TileIndex>>;

/// Coordinates federated operations across the registered backends
pub struct FederationManager {
    registry: Arc<BackendRegistry>,
    schemas: RwLock<HashMap<String, Arc<DatabaseSchema>>>,
}

impl FederationManager {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            registry,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    /// Connects every configured backend (unreachable ones are skipped
    /// with a warning) and discovers the schema of each reachable one.
    pub async fn connect(config: &FederationConfig) -> EngineResult<Self> {
        let registry = Arc::new(connect_backends(config).await);
        let manager = Self::new(registry);
        manager.discover_schema(None).await?;
        Ok(manager)
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Cached schema for one backend, if discovered
    pub async fn schema(&self, backend: &str) -> Option<Arc<DatabaseSchema>> {
        self.schemas.read().await.get(backend).cloned()
    }

    /// Discovers (or re-discovers) the dimensional schema of the selected
    /// backends, one concurrent worker per backend, refreshing the cache.
    #[instrument(skip(self, backends))]
    pub async fn discover_schema(
        &self,
        backends: Option<&[String]>,
    ) -> EngineResult<HashMap<String, Arc<DatabaseSchema>>> {
        let names = self.select_backends(backends)?;
        let registry = Arc::clone(&self.registry);

        let discovered = run_all(&names, |name| {
            let registry = Arc::clone(&registry);
            async move {
                let backend = registry
                    .get(&name)
                    .ok_or_else(|| EngineError::backend_not_found(&name))?;
                discover_backend_schema(backend.as_ref()).await
            }
        })
        .await?;

        let discovered: HashMap<String, Arc<DatabaseSchema>> = discovered
            .into_iter()
            .map(|(name, schema)| (name, Arc::new(schema)))
            .collect();

        let mut cache = self.schemas.write().await;
        for (name, schema) in &discovered {
            cache.insert(name.clone(), Arc::clone(schema));
        }

        Ok(discovered)
    }

    /// Returns, per backend and per ndarray type, the tiles whose extents
    /// overlap the requested dimensional ranges.
    ///
    /// Validation is synchronous and happens before any backend I/O: an
    /// inverted range is `EmptyRange`, and a requested dimension unknown
    /// to every selected type is `InvalidDimension`. Each type is then
    /// queried with the subset of ranges it understands; types with no
    /// overlapping tiles contribute no entry to their backend's map.
    #[instrument(skip(self, ranges, type_tags, backends))]
    pub async fn query_tiles(
        &self,
        ranges: &HashMap<String, DimensionRange>,
        type_tags: Option<&[String]>,
        backends: Option<&[String]>,
    ) -> EngineResult<FederatedTileMap> {
        let names = self.select_backends(backends)?;

        let mut schemas: HashMap<String, Arc<DatabaseSchema>> = HashMap::new();
        {
            let cache = self.schemas.read().await;
            for name in &names {
                let schema = cache.get(name).cloned().ok_or_else(|| {
                    EngineError::internal(format!(
                        "no discovered schema for backend '{name}'; run discover_schema first"
                    ))
                })?;
                schemas.insert(name.clone(), schema);
            }
        }

        validate_ranges(ranges, type_tags, &schemas)?;

        let type_filter: Option<Vec<String>> = type_tags.map(|tags| tags.to_vec());
        let registry = Arc::clone(&self.registry);
        let ranges = ranges.clone();

        run_all(&names, |name| {
            let registry = Arc::clone(&registry);
            let schema = Arc::clone(&schemas[&name]);
            let ranges = ranges.clone();
            let type_filter = type_filter.clone();
            async move {
                let backend = registry
                    .get(&name)
                    .ok_or_else(|| EngineError::backend_not_found(&name))?;
                query_backend_tiles(backend.as_ref(), &schema, &ranges, type_filter.as_deref())
                    .await
            }
        })
        .await
    }

    /// Resolves the backend selection to a sorted, deduplicated name list
    fn select_backends(&self, backends: Option<&[String]>) -> EngineResult<Vec<String>> {
        match backends {
            None => Ok(self.registry.names()),
            Some(requested) => {
                let mut names = Vec::with_capacity(requested.len());
                for name in requested {
                    if self.registry.get(name).is_none() {
                        return Err(EngineError::backend_not_found(name));
                    }
                    names.push(name.clone());
                }
                names.sort();
                names.dedup();
                Ok(names)
            }
        }
    }
}

/// Runs the per-type range queries against one backend
async fn query_backend_tiles(
    backend: &dyn Backend,
    schema: &DatabaseSchema,
    ranges: &HashMap<String, DimensionRange>,
    type_filter: Option<&[String]>,
) -> EngineResult<HashMap<String, TileIndex>> {
    let mut tiles_by_type = HashMap::new();

    let mut type_tags: Vec<&String> = schema.ndarray_types.keys().collect();
    type_tags.sort();

    for type_tag in type_tags {
        if let Some(filter) = type_filter {
            if !filter.iter().any(|tag| tag == type_tag) {
                continue;
            }
        }

        let ndarray_type = &schema.ndarray_types[type_tag];
        let dimension_tags = ndarray_type.dimension_tags_by_creation_order();

        // Only the ranges this type understands participate in the filter
        let type_ranges: HashMap<String, DimensionRange> = ranges
            .iter()
            .filter(|(tag, _)| ndarray_type.dimensions.contains_key(*tag))
            .map(|(tag, range)| (tag.clone(), *range))
            .collect();

        let sql = synthesize_tile_query(ndarray_type, &type_ranges)?;
        let result = backend.submit(&sql).await?;
        let index = build_tile_index(&result, &dimension_tags)?;

        tracing::debug!(
            backend = %backend.name(),
            ndarray_type = %type_tag,
            tiles = index.len(),
            "range query finished"
        );

        if !index.is_empty() {
            tiles_by_type.insert(type_tag.clone(), index);
        }
    }

    Ok(tiles_by_type)
}

/// Synchronous request validation, before any worker is dispatched
fn validate_ranges(
    ranges: &HashMap<String, DimensionRange>,
    type_tags: Option<&[String]>,
    schemas: &HashMap<String, Arc<DatabaseSchema>>,
) -> EngineResult<()> {
    let mut requested: Vec<&String> = ranges.keys().collect();
    requested.sort();

    for tag in requested {
        let range = &ranges[tag];
        if range.min > range.max {
            return Err(EngineError::empty_range(tag, range.min, range.max));
        }

        let known = schemas
            .values()
            .flat_map(|schema| schema.ndarray_types.values())
            .filter(|ndarray_type| match type_tags {
                Some(filter) => filter.iter().any(|t| t == &ndarray_type.tag),
                None => true,
            })
            .any(|ndarray_type| ndarray_type.dimensions.contains_key(tag));

        if !known {
            return Err(EngineError::invalid_dimension(
                tag,
                "any selected ndarray type",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{ColumnInfo, QueryResult, Row, Value};
    use crate::schema::model::{Dimension, NdarrayType};
    use async_trait::async_trait;

    /// Canned backend: discovery queries get `discovery`, tile queries get
    /// `tiles` (or an error when `fail_tiles` is set).
    struct MockBackend {
        name: String,
        discovery: QueryResult,
        tiles: QueryResult,
        fail_tiles: bool,
    }

    impl MockBackend {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                discovery: QueryResult::empty(),
                tiles: QueryResult::empty(),
                fail_tiles: false,
            }
        }

        fn with_tiles(mut self, tiles: QueryResult) -> Self {
            self.tiles = tiles;
            self
        }

        fn failing_tiles(mut self) -> Self {
            self.fail_tiles = true;
            self
        }
    }

    #[async_trait]
    impl Backend for MockBackend {
        fn name(&self) -> &str {
            &self.name
        }

        fn driver_id(&self) -> &'static str {
            "mock"
        }

        async fn test_connection(&self) -> EngineResult<()> {
            Ok(())
        }

        async fn submit(&self, sql: &str) -> EngineResult<QueryResult> {
            if sql.contains("from ndarray_type") {
                return Ok(self.discovery.clone());
            }
            if self.fail_tiles {
                return Err(EngineError::query_failed(&self.name, "tile query refused"));
            }
            Ok(self.tiles.clone())
        }
    }

    fn scene_schema() -> Arc<DatabaseSchema> {
        let mut dimensions = HashMap::new();
        for (tag, creation_order) in [("t", 0), ("xy", 1)] {
            dimensions.insert(
                tag.to_string(),
                Arc::new(Dimension {
                    tag: tag.to_string(),
                    id: creation_order as i64 + 100,
                    creation_order,
                    extent: None,
                    elements: None,
                    cache: None,
                    origin: None,
                    index_reference_system: None,
                }),
            );
        }

        let mut ndarray_types = HashMap::new();
        ndarray_types.insert(
            "scene".to_string(),
            NdarrayType {
                tag: "scene".to_string(),
                id: 10,
                name: "Landsat scene".to_string(),
                measurement_types: HashMap::new(),
                domains: HashMap::new(),
                dimensions,
            },
        );

        Arc::new(DatabaseSchema { ndarray_types })
    }

    fn tile_result(rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult {
            columns: ["t_index", "xy_index", "tile_id"]
                .iter()
                .map(|name| ColumnInfo {
                    name: name.to_string(),
                    data_type: "int8".to_string(),
                    nullable: true,
                })
                .collect(),
            rows: rows.into_iter().map(|values| Row { values }).collect(),
            execution_time_ms: 0.0,
        }
    }

    async fn manager_with(backends: Vec<MockBackend>) -> FederationManager {
        let mut registry = BackendRegistry::new();
        let mut names = Vec::new();
        for backend in backends {
            names.push(backend.name.clone());
            registry.register(Arc::new(backend));
        }

        let manager = FederationManager::new(Arc::new(registry));
        {
            let mut cache = manager.schemas.write().await;
            for name in names {
                cache.insert(name, scene_schema());
            }
        }
        manager
    }

    fn range(min: f64, max: f64) -> HashMap<String, DimensionRange> {
        let mut ranges = HashMap::new();
        ranges.insert("t".to_string(), DimensionRange::new(min, max));
        ranges
    }

    #[tokio::test]
    async fn query_tiles_collects_per_backend_results() {
        let tiles = tile_result(vec![vec![Value::Int(1), Value::Int(0), Value::Int(900)]]);
        let manager = manager_with(vec![
            MockBackend::new("a").with_tiles(tiles.clone()),
            MockBackend::new("b").with_tiles(tiles),
        ])
        .await;

        let result = manager
            .query_tiles(&range(5.0, 15.0), None, None)
            .await
            .expect("query should succeed");

        assert_eq!(result.len(), 2);
        for backend in ["a", "b"] {
            let index = &result[backend]["scene"];
            assert_eq!(index.len(), 1);
            assert!(index.contains_key(&vec![1, 0]));
        }
    }

    #[tokio::test]
    async fn empty_tile_index_drops_the_type_entry() {
        let manager = manager_with(vec![MockBackend::new("a")]).await;

        let result = manager
            .query_tiles(&range(5.0, 15.0), None, None)
            .await
            .expect("query should succeed");

        // Backend appears, but the type with no matching tiles does not
        assert!(result["a"].is_empty());
    }

    #[tokio::test]
    async fn inverted_range_fails_before_any_io() {
        let manager = manager_with(vec![MockBackend::new("a")]).await;

        let err = manager
            .query_tiles(&range(15.0, 5.0), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyRange { .. }));
    }

    #[tokio::test]
    async fn unknown_dimension_fails_before_any_io() {
        let manager = manager_with(vec![MockBackend::new("a")]).await;

        let mut ranges = HashMap::new();
        ranges.insert("wavelength".to_string(), DimensionRange::new(0.0, 1.0));

        let err = manager.query_tiles(&ranges, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidDimension { ref dimension, .. } if dimension == "wavelength"
        ));
    }

    #[tokio::test]
    async fn unknown_backend_selection_is_rejected() {
        let manager = manager_with(vec![MockBackend::new("a")]).await;

        let err = manager
            .query_tiles(&range(0.0, 1.0), None, Some(&["ghost".to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::BackendNotFound { ref backend } if backend == "ghost"
        ));
    }

    #[tokio::test]
    async fn backend_failure_surfaces_as_federation_error() {
        let tiles = tile_result(vec![vec![Value::Int(1), Value::Int(0), Value::Int(900)]]);
        let manager = manager_with(vec![
            MockBackend::new("a").failing_tiles(),
            MockBackend::new("b").with_tiles(tiles),
        ])
        .await;

        let err = manager
            .query_tiles(&range(5.0, 15.0), None, None)
            .await
            .unwrap_err();

        match err {
            EngineError::Federation { backend, source } => {
                assert_eq!(backend, "a");
                assert!(matches!(*source, EngineError::QueryFailed { .. }));
            }
            other => panic!("expected federation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn query_without_discovered_schema_is_an_error() {
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(MockBackend::new("a")));
        let manager = FederationManager::new(Arc::new(registry));

        let err = manager
            .query_tiles(&range(0.0, 1.0), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Internal { .. }));
    }

    #[tokio::test]
    async fn discover_schema_populates_the_cache() {
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(MockBackend::new("a")));
        let manager = FederationManager::new(Arc::new(registry));

        let discovered = manager
            .discover_schema(None)
            .await
            .expect("discovery should succeed");

        assert_eq!(discovered.len(), 1);
        assert!(discovered["a"].ndarray_types.is_empty());
        assert!(manager.schema("a").await.is_some());
    }

    #[tokio::test]
    async fn type_filter_restricts_validation_scope() {
        let tiles = tile_result(vec![vec![Value::Int(1), Value::Int(0), Value::Int(900)]]);
        let manager = manager_with(vec![MockBackend::new("a").with_tiles(tiles)]).await;

        let result = manager
            .query_tiles(&range(5.0, 15.0), Some(&["other_type".to_string()]), None)
            .await;

        // "t" belongs to no selected type once the filter excludes "scene"
        assert!(matches!(
            result.unwrap_err(),
            EngineError::InvalidDimension { .. }
        ));
    }
}
