// Range queries: per-type SQL synthesis + tile index construction

pub mod synthesizer;
pub mod tile_index;

pub use synthesizer::{synthesize_tile_query, DimensionRange};
pub use tile_index::{build_tile_index, TileIndex, TileRecord};
