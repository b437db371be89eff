//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;
use std::str::FromStr;
use tracing::warn;

use crate::cache::{CacheBackend, CacheConfig};
use crate::middleware::rate_limit::FailurePolicy;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    pub rate_limit_failure_policy: FailurePolicy,
    /// Identificar al cliente por `X-Forwarded-For` (solo detrás de un proxy confiable)
    pub trust_forwarded_for: bool,
    pub slow_request_threshold_ms: u64,
    /// Desactiva rate limiting, timing y monitoreo
    pub testing: bool,
    pub cache: CacheConfig,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 8000,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
            rate_limit_requests: 100,
            rate_limit_window: 60,
            rate_limit_failure_policy: FailurePolicy::Open,
            trust_forwarded_for: false,
            slow_request_threshold_ms: 1000,
            testing: false,
            cache: CacheConfig::default(),
        }
    }
}

impl EnvironmentConfig {
    /// Leer configuración desde variables de entorno, con valores por defecto
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let cache_defaults = defaults.cache.clone();

        Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_env("PORT", defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            rate_limit_requests: parse_env("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests),
            rate_limit_window: parse_env("RATE_LIMIT_WINDOW", defaults.rate_limit_window),
            rate_limit_failure_policy: parse_env(
                "RATE_LIMIT_FAILURE_POLICY",
                defaults.rate_limit_failure_policy,
            ),
            trust_forwarded_for: parse_env("TRUST_FORWARDED_FOR", defaults.trust_forwarded_for),
            slow_request_threshold_ms: parse_env(
                "SLOW_REQUEST_THRESHOLD_MS",
                defaults.slow_request_threshold_ms,
            ),
            testing: parse_env("TESTING", defaults.testing),
            cache: CacheConfig {
                redis_url: env::var("REDIS_URL").unwrap_or(cache_defaults.redis_url),
                backend: parse_env::<CacheBackend>("CACHE_BACKEND", cache_defaults.backend),
                prefix: env::var("CACHE_PREFIX").unwrap_or(cache_defaults.prefix),
                store_timeout_ms: parse_env("STORE_TIMEOUT_MS", cache_defaults.store_timeout_ms),
            },
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Leer y parsear una variable; si no es válida se usa el valor por defecto
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️ Valor inválido para {} ('{}'): {}, usando valor por defecto", name, raw, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnvironmentConfig::default();
        assert!(config.is_development());
        assert_eq!(config.server_url(), "0.0.0.0:8000");
        assert_eq!(config.rate_limit_requests, 100);
        assert_eq!(config.rate_limit_window, 60);
        assert_eq!(config.cache.prefix, "yoga_");
        assert!(!config.trust_forwarded_for);
    }

    #[test]
    fn test_parse_env_falls_back_on_invalid_value() {
        env::set_var("YOGA_TEST_INVALID_PORT", "not-a-port");
        assert_eq!(parse_env("YOGA_TEST_INVALID_PORT", 8000u16), 8000);

        env::set_var("YOGA_TEST_VALID_WINDOW", " 30 ");
        assert_eq!(parse_env("YOGA_TEST_VALID_WINDOW", 60u64), 30);

        assert!(!parse_env("YOGA_TEST_UNSET_FLAG", false));
    }

    #[test]
    fn test_from_env_reads_cache_and_proxy_settings() {
        env::set_var("CACHE_PREFIX", "estudio_");
        env::set_var("STORE_TIMEOUT_MS", "250");
        env::set_var("TRUST_FORWARDED_FOR", "true");

        let config = EnvironmentConfig::from_env();
        assert_eq!(config.cache.prefix, "estudio_");
        assert_eq!(config.cache.store_timeout_ms, 250);
        assert!(config.trust_forwarded_for);

        env::remove_var("CACHE_PREFIX");
        env::remove_var("STORE_TIMEOUT_MS");
        env::remove_var("TRUST_FORWARDED_FOR");
    }
}
