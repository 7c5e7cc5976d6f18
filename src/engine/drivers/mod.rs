// Backend driver implementations

pub mod postgres;

pub use postgres::{connect_backends, PostgresBackend};
