// Federated execution: worker-per-backend runner + public operations

pub mod manager;
pub mod runner;

pub use manager::{FederatedTileMap, FederationManager};
pub use runner::run_all;
