//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. Todo lo que contiene es barato de clonar.

use std::sync::Arc;

use crate::cache::{CacheClient, CacheManager, KeyValueStore};
use crate::config::environment::EnvironmentConfig;
use crate::middleware::rate_limit::RateLimiter;
use crate::monitoring::{AlertManager, MetricsCollector};
use crate::repositories::YogaRepository;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub repository: YogaRepository,
    pub cache: CacheManager,
    pub rate_limiter: RateLimiter,
    pub metrics: MetricsCollector,
    pub alerts: AlertManager,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        store: Arc<dyn KeyValueStore>,
        repository: YogaRepository,
        metrics: MetricsCollector,
    ) -> Self {
        let cache = CacheManager::new(CacheClient::new(store.clone()), config.cache.prefix.clone());
        let rate_limiter = RateLimiter::new(&config, store);

        Self {
            config,
            repository,
            cache,
            rate_limiter,
            metrics,
            alerts: AlertManager::new(),
        }
    }
}
