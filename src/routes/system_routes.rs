//! Endpoints de sistema: bienvenida, salud, estado y métricas

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::error;

use crate::cache::CacheStats;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_system_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/status", get(system_status))
        .route("/api/v1/metrics", get(metrics_dashboard))
        .route("/api/v1/metrics/cache", get(cache_metrics))
        .route("/api/v1/metrics/prometheus", get(prometheus_metrics))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Bienvenido al Centro de Yoga Paz Interior",
        "status": "active",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Estado completo del sistema; dispara las revisiones de alertas
async fn system_status(State(state): State<AppState>) -> Json<Value> {
    if state.config.testing {
        return Json(json!({ "status": "healthy", "mode": "testing" }));
    }

    let summary = state.metrics.get_metrics_summary().await;
    let occupancy = state.repository.occupancy().await;

    state.alerts.check_performance_alerts(&summary).await;
    state.alerts.check_business_alerts(occupancy.average_occupancy).await;

    Json(json!({
        "status": "healthy",
        "metrics": summary,
        "alerts": {
            "active": state.alerts.active_alerts().await,
            "stats": state.alerts.alert_stats().await,
        }
    }))
}

async fn metrics_dashboard(State(state): State<AppState>) -> Json<Value> {
    let summary = state.metrics.get_metrics_summary().await;
    let occupancy = state.repository.occupancy().await;

    Json(json!({
        "status": "success",
        "timestamp": summary.timestamp,
        "metrics": {
            "performance": {
                "response_time": summary.avg_response_time,
                "max_response_time": summary.max_response_time,
                "requests_per_hour": summary.requests_last_hour,
            },
            "reliability": {
                "error_rate": summary.error_rate,
                "total_errors": summary.errors_last_hour,
            },
            "business": {
                "active_classes": occupancy.active_classes,
                "reservations": occupancy.reservations,
                "average_occupancy": occupancy.average_occupancy,
            }
        }
    }))
}

async fn cache_metrics(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.get_stats().await)
}

async fn prometheus_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.export_prometheus().map_err(|e| {
        error!("❌ Error exportando métricas Prometheus: {}", e);
        AppError::Internal("Error exportando métricas".to_string())
    })?;

    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
