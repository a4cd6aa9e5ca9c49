mod config;
mod database;
mod service;
mod service_provider;

pub use config::{ProvisionerConfig, StorageBackend};
pub use database::{MemoryRepository, RedisRepository};
pub use service::HttpHostPlatform;
pub use service_provider::ServiceProvider;
