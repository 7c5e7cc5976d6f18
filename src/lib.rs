// GridFed - Federated ndarray catalog and tile range queries
// Core library

pub mod config;
pub mod engine;
pub mod federation;
pub mod observability;
pub mod query;
pub mod schema;

pub use config::{BackendConfig, FederationConfig};
pub use engine::error::{EngineError, EngineResult};
pub use engine::registry::BackendRegistry;
pub use engine::traits::Backend;
pub use federation::manager::{FederatedTileMap, FederationManager};
pub use query::synthesizer::DimensionRange;
pub use query::tile_index::{TileIndex, TileRecord};
pub use schema::model::DatabaseSchema;
