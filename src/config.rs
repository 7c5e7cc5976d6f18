//! Federation configuration
//!
//! Consumed as a finished mapping from backend name to connection
//! parameters; reading and merging configuration files is the caller's
//! concern.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Connection parameters for one backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub pool_max_connections: Option<u32>,
    #[serde(default)]
    pub pool_min_connections: Option<u32>,
    #[serde(default)]
    pub pool_acquire_timeout_secs: Option<u32>,
}

/// The full federation configuration: backend name -> connection parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FederationConfig {
    pub backends: HashMap<String, BackendConfig>,
}
