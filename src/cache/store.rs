//! Contrato del almacén clave/valor
//!
//! Interfaz mínima que necesitan el cache y el rate limiter. Los valores viajan
//! como strings (JSON ya serializado o contadores enteros).

use async_trait::async_trait;
use thiserror::Error;

/// Errores del almacén
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store call timed out after {0}ms")]
    Timeout(u64),

    #[error("Invalid value for key '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Operaciones soportadas por un backend de cache
///
/// Las implementaciones deben poder usarse concurrentemente sin locks del lado
/// del cliente; la atomicidad por clave es responsabilidad del backend.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Guardar valor con expiración en segundos
    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Eliminar una clave, retorna cuántas se eliminaron
    async fn delete(&self, key: &str) -> StoreResult<u64>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Claves que coinciden con un patrón glob (`*`, `?`)
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    async fn delete_many(&self, keys: &[String]) -> StoreResult<u64>;

    /// Incremento atómico; una clave inexistente empieza en 0 y queda sin TTL
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    /// Fijar expiración sobre una clave existente
    async fn expire(&self, key: &str, ttl: u64) -> StoreResult<bool>;

    /// TTL restante, `None` si la clave no existe o no expira
    async fn ttl(&self, key: &str) -> StoreResult<Option<u64>>;

    async fn ping(&self) -> StoreResult<()>;
}
