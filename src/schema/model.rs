//! In-memory model of one backend's dimensional catalog
//!
//! The tree is built once per backend at startup by the schema builder
//! and is read-only afterward; a schema change requires a full rebuild.
//!
//! A `Dimension` is owned once (heap-allocated behind `Arc`) and
//! referenced both by its `Domain` and, redundantly, by the owning
//! `NdarrayType`'s flattened dimension map. Both references resolve to
//! the same allocation so an index query always sees consistent
//! dimension metadata.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A coordinate reference system (e.g. EPSG:4326, seconds since epoch)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSystem {
    pub id: i64,
    pub name: String,
    pub definition: Option<String>,
    pub unit: Option<String>,
}

/// One named axis along which array tiles are indexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Unique within a backend
    pub tag: String,
    pub id: i64,
    /// Defines the canonical dimension ordering for index tuples and SQL
    pub creation_order: i32,
    pub extent: Option<f64>,
    pub elements: Option<i64>,
    pub cache: Option<i64>,
    pub origin: Option<f64>,
    /// Reference system used for tile indexing along this axis, if any
    pub index_reference_system: Option<Arc<ReferenceSystem>>,
}

/// A grouping of dimensions sharing a coordinate reference system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    /// Unique within an ndarray type
    pub tag: String,
    pub id: i64,
    pub name: String,
    pub reference_system: Arc<ReferenceSystem>,
    pub dimensions: HashMap<String, Arc<Dimension>>,
}

/// One measured quantity (e.g. a spectral band) carried by tiles of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementType {
    /// Unique within an ndarray type
    pub tag: String,
    pub metatype_id: i64,
    pub type_id: i64,
    /// Positional index used for ordering during schema discovery
    pub index: i32,
    pub metatype_name: String,
    pub type_name: String,
}

/// A named class of stored multidimensional array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NdarrayType {
    /// Unique within a backend
    pub tag: String,
    pub id: i64,
    pub name: String,
    pub measurement_types: HashMap<String, MeasurementType>,
    pub domains: HashMap<String, Domain>,
    /// Flattened union of all dimensions across this type's domains
    pub dimensions: HashMap<String, Arc<Dimension>>,
}

impl NdarrayType {
    /// Dimensions sorted ascending by creation order
    pub fn dimensions_by_creation_order(&self) -> Vec<Arc<Dimension>> {
        let mut dims: Vec<Arc<Dimension>> = self.dimensions.values().cloned().collect();
        dims.sort_by_key(|dim| dim.creation_order);
        dims
    }

    /// Dimension tags in canonical (creation) order
    ///
    /// This ordering determines the position of each dimension in tile
    /// index tuples and in the synthesized range query.
    pub fn dimension_tags_by_creation_order(&self) -> Vec<String> {
        self.dimensions_by_creation_order()
            .into_iter()
            .map(|dim| dim.tag.clone())
            .collect()
    }
}

/// One backend's dimensional catalog: ndarray types keyed by tag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub ndarray_types: HashMap<String, NdarrayType>,
}
