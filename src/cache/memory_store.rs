//! Almacén en memoria
//!
//! Backend en proceso con la misma semántica que Redis para las operaciones que
//! usa la aplicación. Sirve para desarrollo sin Redis (`CACHE_BACKEND=memory`) y
//! para tests: usa el reloj de tokio, así que `tokio::time::pause` controla las
//! expiraciones, y permite simular caídas del almacén.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::store::{KeyValueStore, StoreError, StoreResult};

/// Frecuencia máxima de la purga de claves expiradas en escrituras
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

/// Backend clave/valor en memoria
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, MemoryEntry>>>,
    unavailable: Arc<AtomicBool>,
    last_sweep: Arc<Mutex<Option<Instant>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simular caída (`false`) o recuperación (`true`) del almacén
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Número de claves vivas
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .map(|entries| entries.values().filter(|e| !e.is_expired(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, MemoryEntry>>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked as down".to_string()));
        }

        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Indica si toca purgar; a lo sumo una vez por `SWEEP_INTERVAL`
    fn sweep_due(&self, now: Instant) -> bool {
        let Ok(mut last) = self.last_sweep.lock() else {
            return false;
        };
        match *last {
            Some(at) if now.saturating_duration_since(at) < SWEEP_INTERVAL => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Eliminar las claves expiradas que nadie volvió a leer
    fn sweep_expired(&self, entries: &mut HashMap<String, MemoryEntry>, now: Instant) {
        if !self.sweep_due(now) {
            return;
        }
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("🧹 Memory store: {} claves expiradas eliminadas", removed);
        }
    }

    /// Obtener la entrada viva para `key`, eliminándola si ya expiró
    fn live_entry<'a>(
        entries: &'a mut HashMap<String, MemoryEntry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut MemoryEntry> {
        if entries.get(key).map_or(false, |e| e.is_expired(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> StoreResult<()> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        self.sweep_expired(&mut entries, now);
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Some(now + Duration::from_secs(ttl)),
            },
        );
        debug!("💾 Memory SETEX {} (TTL: {}s)", key, ttl);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.lock()?;
        Ok(Self::live_entry(&mut entries, key, Instant::now()).map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        Ok(match entries.remove(key) {
            Some(entry) if !entry.is_expired(now) => 1,
            _ => 0,
        })
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut entries = self.lock()?;
        Ok(Self::live_entry(&mut entries, key, Instant::now()).is_some())
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        entries.retain(|_, e| !e.is_expired(now));

        let mut matching: Vec<String> = entries
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        matching.sort();
        Ok(matching)
    }

    async fn delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut entries = self.lock()?;
        let now = Instant::now();

        match Self::live_entry(&mut entries, key, now) {
            Some(entry) => {
                let current: i64 = entry.value.parse().map_err(|_| StoreError::InvalidValue {
                    key: key.to_string(),
                    reason: "value is not an integer".to_string(),
                })?;
                let next = current + 1;
                // El TTL existente se conserva, igual que INCR en Redis
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    MemoryEntry {
                        value: "1".to_string(),
                        expires_at: None,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: u64) -> StoreResult<bool> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        Ok(match Self::live_entry(&mut entries, key, now) {
            Some(entry) => {
                entry.expires_at = Some(now + Duration::from_secs(ttl));
                true
            }
            None => false,
        })
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<u64>> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        Ok(Self::live_entry(&mut entries, key, now)
            .and_then(|e| e.expires_at)
            .map(|at| {
                // Redondeo hacia arriba como Redis: 0.4s restantes cuentan como 1
                let remaining = at.saturating_duration_since(now);
                let secs = remaining.as_secs();
                if remaining.subsec_nanos() > 0 {
                    secs + 1
                } else {
                    secs
                }
            }))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}

/// Coincidencia glob al estilo de `KEYS`: `*`, `?` y `\` para escapar
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some('\\') if p + 1 < pattern.len() && pattern[p + 1] == text[t] => {
                p += 2;
                t += 1;
            }
            Some(&c) if c != '\\' && c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("yoga_list_classes*", "yoga_list_classes:abc"));
        assert!(glob_match("yoga_*", "yoga_"));
        assert!(glob_match("rate_limit:?:*", "rate_limit:a:/api"));
        assert!(glob_match(r"yoga_a\*b", "yoga_a*b"));
        assert!(!glob_match(r"yoga_a\*b", "yoga_axb"));
        assert!(!glob_match("yoga_class_detail*", "yoga_list_classes:abc"));
        assert!(!glob_match("yoga_?", "yoga_"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let store = MemoryStore::new();
        store.set_ex("clave", "valor", 10).await.unwrap();

        assert_eq!(store.ttl("clave").await.unwrap(), Some(10));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(store.get("clave").await.unwrap().as_deref(), Some("valor"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("clave").await.unwrap(), None);
        assert!(!store.exists("clave").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_keeps_existing_ttl() {
        let store = MemoryStore::new();
        store.set_ex("contador", "1", 60).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.incr("contador").await.unwrap(), 2);
        assert_eq!(store.ttl("contador").await.unwrap(), Some(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_sweep_expired_entries_nobody_reads() {
        let store = MemoryStore::new();
        for i in 0..100 {
            let key = format!("rate_limit:10.0.0.{}:/api/v1/classes", i);
            store.set_ex(&key, "1", 10).await.unwrap();
        }
        let raw_len = |store: &MemoryStore| store.entries.lock().unwrap().len();
        assert_eq!(raw_len(&store), 100);

        // Expiradas pero todavía en el mapa: nadie las leyó
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.len(), 0);
        assert_eq!(raw_len(&store), 100);

        // La purga corre como máximo una vez por intervalo
        store.set_ex("otra", "1", 10).await.unwrap();
        assert_eq!(raw_len(&store), 101);

        tokio::time::advance(SWEEP_INTERVAL).await;
        store.set_ex("nueva", "1", 10).await.unwrap();
        assert_eq!(raw_len(&store), 1);
        assert_eq!(store.get("nueva").await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_incr_missing_key_has_no_ttl() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("nuevo").await.unwrap(), 1);
        assert_eq!(store.ttl("nuevo").await.unwrap(), None);

        assert!(store.expire("nuevo", 5).await.unwrap());
        assert_eq!(store.ttl("nuevo").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_incr_rejects_non_integer() {
        let store = MemoryStore::new();
        store.set_ex("texto", "hola", 60).await.unwrap();

        let result = store.incr("texto").await;
        assert!(matches!(result, Err(StoreError::InvalidValue { .. })));
    }

    #[tokio::test]
    async fn test_keys_and_delete_many() {
        let store = MemoryStore::new();
        store.set_ex("yoga_list_classes:1", "[]", 60).await.unwrap();
        store.set_ex("yoga_list_classes:2", "[]", 60).await.unwrap();
        store.set_ex("yoga_class_detail:1", "{}", 60).await.unwrap();

        let keys = store.keys("yoga_list_classes*").await.unwrap();
        assert_eq!(keys, vec!["yoga_list_classes:1", "yoga_list_classes:2"]);

        assert_eq!(store.delete_many(&keys).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_operation() {
        let store = MemoryStore::new();
        store.set_ex("clave", "valor", 60).await.unwrap();
        store.set_available(false);

        assert!(matches!(store.get("clave").await, Err(StoreError::Unavailable(_))));
        assert!(store.ping().await.is_err());
        assert!(store.incr("clave").await.is_err());

        store.set_available(true);
        assert_eq!(store.get("clave").await.unwrap().as_deref(), Some("valor"));
    }
}
