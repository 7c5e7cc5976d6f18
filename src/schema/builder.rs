//! Schema Builder
//!
//! Folds the flat, denormalized discovery row stream of one backend into
//! the nested `DatabaseSchema` tree. Grouping at every nesting level is
//! first-seen-wins: the first row mentioning an entity fixes its
//! attributes, and later rows only descend into it. The same dimension
//! tag recurs across many rows (cross product of measurement types and
//! reference systems), so resolve-or-create must be idempotent per tag
//! within a single build.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::Backend;
use crate::engine::types::{QueryResult, RecordView, Row, Value};
use crate::schema::model::{
    DatabaseSchema, Dimension, Domain, MeasurementType, NdarrayType, ReferenceSystem,
};

/// Discovery query: the whole dimensional catalog of one backend in a
/// single denormalized pass, pre-sorted so downstream ordering falls out
/// of the row order.
pub const SCHEMA_DISCOVERY_QUERY: &str = "-- All ndarray type configuration in one pass
select distinct
  ndarray_type_tag,
  ndarray_type_id,
  ndarray_type_name,
  measurement_type_tag,
  measurement_metatype_id,
  measurement_type_id,
  measurement_type_index,
  measurement_metatype_name,
  measurement_type_name,
  domain_tag,
  domain_id,
  domain_name,
  reference_system.reference_system_id,
  reference_system.reference_system_name,
  reference_system.reference_system_definition,
  reference_system.reference_system_unit,
  dimension_tag,
  dimension_id,
  creation_order,
  dimension_extent,
  dimension_elements,
  dimension_cache,
  dimension_origin,
  index_reference_system.reference_system_id as index_reference_system_id,
  index_reference_system.reference_system_name as index_reference_system_name,
  index_reference_system.reference_system_definition as index_reference_system_definition,
  index_reference_system.reference_system_unit as index_reference_system_unit
from ndarray_type
join ndarray_type_measurement_type using(ndarray_type_id)
join measurement_type using(measurement_metatype_id, measurement_type_id)
join measurement_metatype using(measurement_metatype_id)
join ndarray_type_dimension using(ndarray_type_id)
join dimension_domain using(dimension_id, domain_id)
join domain using(domain_id)
join dimension using(dimension_id)
join indexing_type using(indexing_type_id)
join reference_system using (reference_system_id)
left join reference_system index_reference_system on index_reference_system.reference_system_id = ndarray_type_dimension.index_reference_system_id
order by ndarray_type_tag, measurement_type_index, creation_order;
";

/// Submits the discovery query to one backend and folds the result
pub async fn discover_backend_schema(backend: &dyn Backend) -> EngineResult<DatabaseSchema> {
    let result = backend.submit(SCHEMA_DISCOVERY_QUERY).await?;
    let schema = build_schema(&result)?;
    tracing::debug!(
        backend = %backend.name(),
        ndarray_types = schema.ndarray_types.len(),
        "schema discovered"
    );
    Ok(schema)
}

/// Folds a flat discovery row stream into the nested schema tree
pub fn build_schema(result: &QueryResult) -> EngineResult<DatabaseSchema> {
    let view = RecordView::new(result);
    let mut schema = DatabaseSchema::default();

    for row in view.rows() {
        let type_tag = req_str(&view, row, "ndarray_type_tag")?;
        let ndarray_type = match schema.ndarray_types.entry(type_tag) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let ndarray_type = NdarrayType {
                    tag: entry.key().clone(),
                    id: req_i64(&view, row, "ndarray_type_id")?,
                    name: req_str(&view, row, "ndarray_type_name")?,
                    measurement_types: HashMap::new(),
                    domains: HashMap::new(),
                    dimensions: HashMap::new(),
                };
                entry.insert(ndarray_type)
            }
        };

        let measurement_tag = req_str(&view, row, "measurement_type_tag")?;
        if !ndarray_type.measurement_types.contains_key(&measurement_tag) {
            let measurement = MeasurementType {
                tag: measurement_tag.clone(),
                metatype_id: req_i64(&view, row, "measurement_metatype_id")?,
                type_id: req_i64(&view, row, "measurement_type_id")?,
                index: req_i32(&view, row, "measurement_type_index")?,
                metatype_name: req_str(&view, row, "measurement_metatype_name")?,
                type_name: req_str(&view, row, "measurement_type_name")?,
            };
            ndarray_type
                .measurement_types
                .insert(measurement_tag, measurement);
        }

        let domain_tag = req_str(&view, row, "domain_tag")?;
        let domain = match ndarray_type.domains.entry(domain_tag) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let reference_system = Arc::new(ReferenceSystem {
                    id: req_i64(&view, row, "reference_system_id")?,
                    name: req_str(&view, row, "reference_system_name")?,
                    definition: opt_str(&view, row, "reference_system_definition"),
                    unit: opt_str(&view, row, "reference_system_unit"),
                });
                let domain = Domain {
                    tag: entry.key().clone(),
                    id: req_i64(&view, row, "domain_id")?,
                    name: req_str(&view, row, "domain_name")?,
                    reference_system,
                    dimensions: HashMap::new(),
                };
                entry.insert(domain)
            }
        };

        let dimension_tag = req_str(&view, row, "dimension_tag")?;
        if !domain.dimensions.contains_key(&dimension_tag) {
            let index_reference_system =
                parse_index_reference_system(&view, row, &domain.reference_system)?;
            let dimension = Arc::new(Dimension {
                tag: dimension_tag.clone(),
                id: req_i64(&view, row, "dimension_id")?,
                creation_order: req_i32(&view, row, "creation_order")?,
                extent: opt_f64(&view, row, "dimension_extent"),
                elements: opt_i64(&view, row, "dimension_elements"),
                cache: opt_i64(&view, row, "dimension_cache"),
                origin: opt_f64(&view, row, "dimension_origin"),
                index_reference_system,
            });

            // One allocation, two references: the domain and the owning
            // type's flattened map must observe the same dimension.
            domain
                .dimensions
                .insert(dimension_tag.clone(), Arc::clone(&dimension));
            ndarray_type.dimensions.insert(dimension_tag, dimension);
        }
    }

    Ok(schema)
}

/// Builds the optional index reference system for a dimension, sharing
/// the domain's allocation when the ids coincide.
fn parse_index_reference_system(
    view: &RecordView<'_>,
    row: &Row,
    domain_reference_system: &Arc<ReferenceSystem>,
) -> EngineResult<Option<Arc<ReferenceSystem>>> {
    let id = match view.get(row, "index_reference_system_id") {
        Some(value) if !value.is_null() => value
            .as_i64()
            .ok_or_else(|| EngineError::missing_column("index_reference_system_id"))?,
        _ => return Ok(None),
    };

    if id == domain_reference_system.id {
        return Ok(Some(Arc::clone(domain_reference_system)));
    }

    Ok(Some(Arc::new(ReferenceSystem {
        id,
        name: req_str(view, row, "index_reference_system_name")?,
        definition: opt_str(view, row, "index_reference_system_definition"),
        unit: opt_str(view, row, "index_reference_system_unit"),
    })))
}

fn req_str(view: &RecordView<'_>, row: &Row, column: &str) -> EngineResult<String> {
    view.get(row, column)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EngineError::missing_column(column))
}

fn req_i64(view: &RecordView<'_>, row: &Row, column: &str) -> EngineResult<i64> {
    view.get(row, column)
        .and_then(Value::as_i64)
        .ok_or_else(|| EngineError::missing_column(column))
}

fn req_i32(view: &RecordView<'_>, row: &Row, column: &str) -> EngineResult<i32> {
    req_i64(view, row, column).map(|v| v as i32)
}

fn opt_str(view: &RecordView<'_>, row: &Row, column: &str) -> Option<String> {
    view.get(row, column)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn opt_f64(view: &RecordView<'_>, row: &Row, column: &str) -> Option<f64> {
    view.get(row, column).and_then(Value::as_f64)
}

fn opt_i64(view: &RecordView<'_>, row: &Row, column: &str) -> Option<i64> {
    view.get(row, column).and_then(Value::as_i64)
}
