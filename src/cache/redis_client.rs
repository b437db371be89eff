use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{debug, info};

use super::store::{KeyValueStore, StoreResult};
use super::CacheConfig;

/// Cliente Redis con connection pooling y operaciones async
///
/// `ConnectionManager` es barato de clonar y multiplexa la conexión, así que
/// cada operación trabaja sobre su propio clon sin locks.
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
}

impl RedisClient {
    /// Crear nuevo cliente Redis
    pub async fn new(config: &CacheConfig) -> StoreResult<Self> {
        info!("🔗 Conectando a Redis: {}", config.redis_url);

        let client = redis::Client::open(config.redis_url.clone())?;
        let manager = ConnectionManager::new(client).await?;

        // Test de conexión usando un comando simple
        let mut conn = manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!("✅ Redis conectado exitosamente");

        Ok(Self { manager })
    }
}

#[async_trait]
impl KeyValueStore for RedisClient {
    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> StoreResult<()> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl).await?;
        debug!("💾 Redis SETEX {} (TTL: {}s)", key, ttl);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.manager.clone();
        Ok(conn.del::<_, u64>(key).await?)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.manager.clone();
        Ok(conn.exists::<_, bool>(key).await?)
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.keys::<_, Vec<String>>(pattern).await?)
    }

    async fn delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.manager.clone();
        Ok(conn.del::<_, u64>(keys.to_vec()).await?)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.manager.clone();
        Ok(conn.incr::<_, _, i64>(key, 1).await?)
    }

    async fn expire(&self, key: &str, ttl: u64) -> StoreResult<bool> {
        let mut conn = self.manager.clone();
        let updated: bool = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl)
            .query_async(&mut conn)
            .await?;
        Ok(updated)
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<u64>> {
        let mut conn = self.manager.clone();
        let ttl: i64 = conn.ttl(key).await?;

        // -2: no existe, -1: sin expiración
        if ttl > 0 {
            Ok(Some(ttl as u64))
        } else {
            Ok(None)
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
