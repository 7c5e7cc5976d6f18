// Schema discovery: catalog model + flat-row-stream fold

pub mod builder;
pub mod model;

pub use builder::{build_schema, discover_backend_schema, SCHEMA_DISCOVERY_QUERY};
pub use model::{DatabaseSchema, Dimension, Domain, MeasurementType, NdarrayType, ReferenceSystem};
