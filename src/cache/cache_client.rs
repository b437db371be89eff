use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::store::{KeyValueStore, StoreResult};

/// Cliente de cache tipado sobre el almacén clave/valor
///
/// Todas las operaciones son fail-open: una caída del almacén se registra y se
/// comporta como un cache vacío, nunca como un error para el llamador.
#[derive(Clone)]
pub struct CacheClient {
    store: Arc<dyn KeyValueStore>,
}

impl CacheClient {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Guardar valor en cache (best-effort)
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: u64) {
        let serialized = match serde_json::to_string(value) {
            Ok(serialized) => serialized,
            Err(e) => {
                error!("❌ Error serializando valor para clave {}: {}", key, e);
                return;
            }
        };

        match self.store.set_ex(key, &serialized, ttl).await {
            Ok(()) => debug!("💾 Cache SET para clave: {} (TTL: {}s)", key, ttl),
            Err(e) => error!("❌ Error guardando en cache para clave {}: {}", key, e),
        }
    }

    /// Obtener valor del cache; `None` ante miss, caída o JSON inválido
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(value)) => match serde_json::from_str(&value) {
                Ok(deserialized) => {
                    debug!("📥 Cache HIT para clave: {}", key);
                    Some(deserialized)
                }
                Err(e) => {
                    warn!("⚠️ Valor corrupto en cache para clave {}: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                debug!("❌ Cache MISS para clave: {}", key);
                None
            }
            Err(e) => {
                warn!("⚠️ Error leyendo cache para clave {}: {}", key, e);
                None
            }
        }
    }

    pub async fn delete(&self, key: &str) {
        match self.store.delete(key).await {
            Ok(count) => debug!("🗑️ Cache DELETE para clave: {} (eliminados: {})", key, count),
            Err(e) => warn!("⚠️ Error eliminando cache para clave {}: {}", key, e),
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        match self.store.exists(key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("⚠️ Error verificando existencia de clave {}: {}", key, e);
                false
            }
        }
    }

    /// Claves que coinciden con el patrón; vacío si el almacén falla
    pub async fn keys_matching(&self, pattern: &str) -> Vec<String> {
        self.try_keys_matching(pattern).await.unwrap_or_else(|e| {
            warn!("⚠️ Error buscando claves con patrón {}: {}", pattern, e);
            Vec::new()
        })
    }

    /// Variante que expone el error, para quien necesita distinguir caída de vacío
    pub async fn try_keys_matching(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.store.keys(pattern).await
    }

    pub async fn delete_many(&self, keys: &[String]) -> u64 {
        match self.try_delete_many(keys).await {
            Ok(count) => count,
            Err(e) => {
                warn!("⚠️ Error eliminando {} claves: {}", keys.len(), e);
                0
            }
        }
    }

    pub async fn try_delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        self.store.delete_many(keys).await
    }
}
