//! Middleware de Rate Limiting
//!
//! Este módulo maneja la limitación de velocidad de requests
//! para prevenir abuso de la API.
//!
//! Cada par (cliente, endpoint) tiene un contador `rate_limit:<cliente>:<endpoint>`
//! en el almacén compartido. El primer request de la ventana lo crea con
//! TTL = ventana; los siguientes lo incrementan sin tocar el TTL. Como la
//! ventana no se reinicia con cada request, una ráfaga justo en el borde
//! puede dejar pasar hasta 2× el límite entre dos ventanas consecutivas.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::cache::{KeyValueStore, StoreError, StoreResult};
use crate::config::EnvironmentConfig;
use crate::utils::errors::AppError;

/// Rutas que nunca se limitan
pub const DEFAULT_EXEMPT_PATHS: [&str; 2] = ["/health", "/"];

/// Qué hacer cuando el almacén de contadores no responde
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Dejar pasar el request
    Open,
    /// Rechazar el request con 503
    Closed,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

/// Resultado de un request permitido
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Contado dentro de la ventana actual
    Allowed { count: i64 },
    /// Ruta exenta, no se consultó el almacén
    Exempt,
    /// El almacén falló y la política es fail-open
    FailedOpen,
}

/// Errores de rate limiting
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded")]
    LimitExceeded { retry_after: u64 },

    #[error("Rate limit store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl From<RateLimitError> for AppError {
    fn from(error: RateLimitError) -> Self {
        match error {
            RateLimitError::LimitExceeded { retry_after } => {
                AppError::RateLimitExceeded { retry_after }
            }
            RateLimitError::StoreUnavailable(e) => {
                AppError::ServiceUnavailable(format!("Rate limiting unavailable: {}", e))
            }
        }
    }
}

enum WindowState {
    Counted(i64),
    Exceeded { retry_after: u64 },
}

/// Rate limiter de ventana fija respaldado por el almacén clave/valor
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    max_requests: u32,
    window_seconds: u64,
    failure_policy: FailurePolicy,
    exempt_paths: Arc<Vec<String>>,
    trust_forwarded_for: bool,
}

impl RateLimiter {
    /// Crear rate limiter a partir de la configuración
    pub fn new(config: &EnvironmentConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_limits(store, config.rate_limit_requests, config.rate_limit_window)
            .failure_policy(config.rate_limit_failure_policy)
            .trust_forwarded_for(config.trust_forwarded_for)
    }

    pub fn with_limits(store: Arc<dyn KeyValueStore>, max_requests: u32, window_seconds: u64) -> Self {
        Self {
            store,
            max_requests,
            window_seconds,
            failure_policy: FailurePolicy::Open,
            exempt_paths: Arc::new(DEFAULT_EXEMPT_PATHS.iter().map(|p| p.to_string()).collect()),
            trust_forwarded_for: false,
        }
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Solo activar detrás de un proxy que reescribe `X-Forwarded-For`
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn exempt_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exempt_paths = Arc::new(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| p == path)
    }

    /// Clave del contador para un cliente y endpoint
    pub fn rate_limit_key(client_id: &str, endpoint: &str) -> String {
        format!("rate_limit:{}:{}", client_id, endpoint)
    }

    /// Verificar si un cliente ha excedido el límite en un endpoint
    pub async fn check_rate_limit(
        &self,
        client_id: &str,
        endpoint: &str,
    ) -> Result<RateLimitDecision, RateLimitError> {
        if self.is_exempt(endpoint) {
            return Ok(RateLimitDecision::Exempt);
        }

        let key = Self::rate_limit_key(client_id, endpoint);

        match self.count_request(&key).await {
            Ok(WindowState::Counted(count)) => {
                debug!("🚦 {} -> {}/{}", key, count, self.max_requests);
                Ok(RateLimitDecision::Allowed { count })
            }
            Ok(WindowState::Exceeded { retry_after }) => {
                warn!("🚫 Rate limit excedido para {} en {}", client_id, endpoint);
                Err(RateLimitError::LimitExceeded { retry_after })
            }
            Err(e) => match self.failure_policy {
                FailurePolicy::Open => {
                    warn!("⚠️ Error en rate limiting, dejando pasar el request: {}", e);
                    Ok(RateLimitDecision::FailedOpen)
                }
                FailurePolicy::Closed => {
                    error!("❌ Error en rate limiting, rechazando el request: {}", e);
                    Err(RateLimitError::StoreUnavailable(e))
                }
            },
        }
    }

    async fn count_request(&self, key: &str) -> StoreResult<WindowState> {
        let current = match self.store.get(key).await? {
            None => {
                // Check-then-set no atómico: en una carrera se cuela a lo sumo
                // un request extra por ventana
                self.store.set_ex(key, "1", self.window_seconds).await?;
                return Ok(WindowState::Counted(1));
            }
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| StoreError::InvalidValue {
                key: key.to_string(),
                reason: format!("counter '{}' is not an integer", raw),
            })?,
        };

        if current >= i64::from(self.max_requests) {
            let retry_after = self
                .store
                .ttl(key)
                .await
                .ok()
                .flatten()
                .unwrap_or(self.window_seconds);
            return Ok(WindowState::Exceeded { retry_after });
        }

        let count = self.store.incr(key).await?;
        if count == 1 {
            // La clave expiró entre el GET y el INCR: INCR la recreó sin TTL
            self.store.expire(key, self.window_seconds).await?;
        }

        Ok(WindowState::Counted(count))
    }
}

/// Identificador del cliente: la IP de la conexión. El primer salto de
/// `X-Forwarded-For` solo se usa si `trust_forwarded` está activo
pub fn client_identifier(request: &Request, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware de rate limiting
pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let endpoint = request.uri().path().to_string();
    if rate_limiter.is_exempt(&endpoint) {
        return Ok(next.run(request).await);
    }

    let client_id = client_identifier(&request, rate_limiter.trust_forwarded_for);
    rate_limiter.check_rate_limit(&client_id, &endpoint).await?;

    Ok(next.run(request).await)
}
