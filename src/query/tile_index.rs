//! Tile Index Builder
//!
//! Folds the rows of a synthesized range query into a mapping keyed by
//! the tuple of per-dimension index values, ordered by dimension creation
//! order. Duplicate tuples overwrite (last row wins); an empty row stream
//! is an empty index, not an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{QueryResult, RecordView, Value};

/// One stored tile's full metadata row
///
/// Beyond the per-dimension `<tag>_index`/`<tag>_min`/`<tag>_max` columns
/// the fields (identity, version, shape, dtype, ...) are whatever the
/// backend returned; they are opaque to this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileRecord {
    pub fields: HashMap<String, Value>,
}

impl TileRecord {
    /// Case-insensitive field accessor
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(&column.to_lowercase())
    }
}

/// Tiles keyed by their per-dimension index tuple (creation order)
pub type TileIndex = HashMap<Vec<i64>, TileRecord>;

/// Builds the tile index for one (backend, ndarray type) query result.
///
/// `dimension_tags` must be the type's tags in creation order; the tuple
/// position of each index value follows it.
pub fn build_tile_index(
    result: &QueryResult,
    dimension_tags: &[String],
) -> EngineResult<TileIndex> {
    let view = RecordView::new(result);
    let mut index = TileIndex::new();

    for row in view.rows() {
        let mut indices = Vec::with_capacity(dimension_tags.len());
        for tag in dimension_tags {
            let column = format!("{}_index", tag.to_lowercase());
            let value = view
                .get(row, &column)
                .and_then(Value::as_i64)
                .ok_or_else(|| EngineError::missing_column(&column))?;
            indices.push(value);
        }

        let fields = result
            .columns
            .iter()
            .zip(row.values.iter())
            .map(|(col, value)| (col.name.to_lowercase(), value.clone()))
            .collect();

        index.insert(indices, TileRecord { fields });
    }

    Ok(index)
}
