//! Memoización respaldada por cache
//!
//! `CacheManager` envuelve cualquier cómputo async con lectura a través del
//! cache (get → compute → set) e invalidación por patrón. Las claves tienen la
//! forma `<prefix><operación>:<md5>` donde el md5 cubre la operación y los
//! argumentos serializados, así que invalidar por nombre de operación alcanza
//! todas sus variantes.
//!
//! La consistencia es eventual dentro del TTL: si la invalidación falla, las
//! entradas viejas igual expiran.

use futures::future::join_all;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, error, info, warn};

use super::cache_client::CacheClient;

/// Estadísticas expuestas por el endpoint de observabilidad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheStats {
    Active {
        total_keys: usize,
        prefix: String,
        status: String,
    },
    Unavailable {
        error: String,
    },
}

/// Gestor de memoización sobre un namespace de claves
#[derive(Clone)]
pub struct CacheManager {
    client: CacheClient,
    prefix: String,
}

impl CacheManager {
    pub fn new(client: CacheClient, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn client(&self) -> &CacheClient {
        &self.client
    }

    /// Generar clave única para cache basada en operación y argumentos
    ///
    /// Determinista entre reinicios (md5, sin semilla). Los argumentos se
    /// serializan como JSON: una tupla conserva el orden posicional y un struct
    /// hace de argumentos con nombre. Los mapas deben ser ordenados
    /// (`BTreeMap`) para que la clave sea estable.
    pub fn generate_key<A: Serialize + ?Sized>(
        &self,
        operation: &str,
        args: &A,
    ) -> Result<String, serde_json::Error> {
        let args = serde_json::to_string(args)?;
        let digest = md5::compute(format!("{}:{}", operation, args));
        Ok(format!("{}{}:{:x}", self.prefix, operation, digest))
    }

    /// Envolver un cómputo con cache de lectura
    ///
    /// `operation` es el nombre del cómputo y por defecto el prefijo lógico de
    /// sus claves; se puede sobrescribir con [`Cached::key_prefix`].
    pub fn cached<F>(&self, operation: impl Into<String>, expire: u64, func: F) -> Cached<F> {
        Cached {
            manager: self.clone(),
            operation: operation.into(),
            key_prefix: None,
            expire,
            func,
        }
    }

    /// Lectura a través del cache para un cómputo puntual
    pub async fn get_or_compute<A, T, E, F, Fut>(
        &self,
        operation: &str,
        args: &A,
        expire: u64,
        compute: F,
    ) -> Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.key_or_bypass(operation, args);
        self.read_through(key, expire, compute).await
    }

    fn key_or_bypass<A: Serialize + ?Sized>(&self, operation: &str, args: &A) -> Option<String> {
        match self.generate_key(operation, args) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(
                    "⚠️ Argumentos no serializables para {}, se omite el cache: {}",
                    operation, e
                );
                None
            }
        }
    }

    async fn read_through<T, E, F, Fut>(
        &self,
        key: Option<String>,
        expire: u64,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(key) = key else {
            return compute().await;
        };

        if let Some(cached) = self.client.get::<T>(&key).await {
            debug!("🎯 Cache hit para {}", key);
            return Ok(cached);
        }

        // Un error del cómputo se propaga tal cual y no se cachea nada
        let result = compute().await?;
        self.client.set(&key, &result, expire).await;
        debug!("💾 Cache miss, guardado para {}", key);

        Ok(result)
    }

    /// Invalidar cache por patrón: elimina `<prefix><pattern>*`
    ///
    /// Retorna cuántas claves se eliminaron. Los errores se registran y nunca se
    /// propagan.
    pub async fn invalidate_pattern(&self, pattern: &str) -> u64 {
        let full_pattern = format!("{}{}*", self.prefix, pattern);

        let keys = match self.client.try_keys_matching(&full_pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                error!("❌ Error invalidando cache con patrón {}: {}", pattern, e);
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        match self.client.try_delete_many(&keys).await {
            Ok(count) => {
                info!("🗑️ Invalidadas {} claves con patrón {}", count, pattern);
                count
            }
            Err(e) => {
                error!("❌ Error invalidando cache con patrón {}: {}", pattern, e);
                0
            }
        }
    }

    /// Invalidar varios patrones en paralelo
    pub async fn invalidate_patterns(&self, patterns: &[&str]) -> u64 {
        join_all(patterns.iter().map(|pattern| self.invalidate_pattern(pattern)))
            .await
            .into_iter()
            .sum()
    }

    /// Obtener estadísticas del cache
    pub async fn get_stats(&self) -> CacheStats {
        match self.client.try_keys_matching(&format!("{}*", self.prefix)).await {
            Ok(keys) => CacheStats::Active {
                total_keys: keys.len(),
                prefix: self.prefix.clone(),
                status: "active".to_string(),
            },
            Err(e) => {
                error!("❌ Error obteniendo stats del cache: {}", e);
                CacheStats::Unavailable {
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Cómputo envuelto con cache de lectura
///
/// El cómputo recibe los argumentos lógicos; cualquier estado que capture el
/// closure (repositorios, clientes) no forma parte de la clave.
pub struct Cached<F> {
    manager: CacheManager,
    operation: String,
    key_prefix: Option<String>,
    expire: u64,
    func: F,
}

impl<F> Cached<F> {
    /// Sobrescribir el prefijo lógico de las claves
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    fn key_name(&self) -> &str {
        self.key_prefix.as_deref().unwrap_or(&self.operation)
    }

    pub fn key_for<A: Serialize + ?Sized>(&self, args: &A) -> Result<String, serde_json::Error> {
        self.manager.generate_key(self.key_name(), args)
    }

    /// Ejecutar el cómputo, consultando el cache primero
    ///
    /// En un hit el cómputo no se invoca.
    pub async fn call<A, T, E, Fut>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        A: Serialize,
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.manager.key_or_bypass(self.key_name(), &args);
        self.manager
            .read_through(key, self.expire, move || (self.func)(args))
            .await
    }
}
