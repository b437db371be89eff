//! Cache
//!
//! Este módulo contiene el almacén clave/valor (Redis o memoria), el cliente
//! de cache fail-open y la capa de memoización.

pub mod cache_client;
pub mod cache_config;
pub mod cache_manager;
pub mod memory_store;
pub mod redis_client;
pub mod store;
pub mod timeout_store;

pub use cache_client::CacheClient;
pub use cache_config::{CacheBackend, CacheConfig};
pub use cache_manager::{CacheManager, CacheStats, Cached};
pub use memory_store::MemoryStore;
pub use redis_client::RedisClient;
pub use store::{KeyValueStore, StoreError, StoreResult};
pub use timeout_store::TimeoutStore;
