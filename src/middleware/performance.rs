//! Middleware de performance
//!
//! Mide el tiempo de cada request, lo expone en `X-Process-Time` (segundos)
//! y lo registra en el recolector de métricas.

use axum::{
    extract::{MatchedPath, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::warn;

use crate::monitoring::UNMATCHED_ROUTE;
use crate::state::AppState;

pub const PROCESS_TIME_HEADER: &str = "x-process-time";

/// Plantilla de la ruta que atendió el request (`/api/v1/classes/:id`)
pub fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

pub async fn performance_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let route = route_label(&request);
    let method = request.method().to_string();
    let start = Instant::now();

    let mut response = next.run(request).await;

    let elapsed = start.elapsed();
    let process_time = elapsed.as_secs_f64();

    if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", process_time)) {
        response.headers_mut().insert(PROCESS_TIME_HEADER, value);
    }

    state
        .metrics
        .record_request(&path, &route, &method, response.status().as_u16(), process_time)
        .await;

    if elapsed.as_millis() as u64 > state.config.slow_request_threshold_ms {
        warn!("🐢 Lentitud detectada en {}: {:.3}s", path, process_time);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    #[test]
    fn test_route_label_without_matched_path() {
        let request = http::Request::builder()
            .uri("/api/v1/classes/42")
            .body(Body::empty())
            .unwrap();
        assert_eq!(route_label(&request), UNMATCHED_ROUTE);
    }
}
