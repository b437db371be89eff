//! Configuración de cache
//!
//! Este módulo contiene la configuración para el sistema de cache.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Backend del almacén clave/valor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Configuración del cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    pub backend: CacheBackend,
    /// Namespace de las claves de memoización
    pub prefix: String,
    pub store_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            backend: CacheBackend::Redis,
            prefix: "yoga_".to_string(),
            store_timeout_ms: 500,
        }
    }
}
