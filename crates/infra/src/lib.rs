//! Infrastructure layer: persistence and configuration.

pub mod config;
pub mod store;

pub use config::{AppConfig, ConfigError, StorageConfig};
pub use store::{
    InMemoryInventoryStore, InventorySnapshot, InventoryStore, PostgresInventoryStore, StoreError,
    StoreResult,
};
