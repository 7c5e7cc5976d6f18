// Federation Engine Module
// Backend abstraction layer: drivers, registry, universal types, errors

pub mod drivers;
pub mod error;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use registry::BackendRegistry;
pub use traits::Backend;
pub use types::*;
