use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::dto::{ApiResponse, ResolveAlertQuery};
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};

pub fn create_alert_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_alerts).delete(clear_resolved_alerts))
        .route("/resolve", post(resolve_alert))
}

/// Alertas activas y su conteo por nivel
async fn list_alerts(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let alerts = state.alerts.active_alerts().await;
    let stats = state.alerts.alert_stats().await;

    Json(ApiResponse::success(json!({
        "alerts": alerts,
        "stats": stats,
    })))
}

async fn resolve_alert(
    State(state): State<AppState>,
    Query(query): Query<ResolveAlertQuery>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    if !state.alerts.resolve_alert(&query.alert_title).await {
        return Err(not_found_error("Alert", &query.alert_title));
    }

    Ok(Json(ApiResponse::success_with_message(
        query.alert_title.clone(),
        format!("Alerta '{}' resuelta", query.alert_title),
    )))
}

/// Mantenimiento: elimina las alertas ya resueltas
async fn clear_resolved_alerts(State(state): State<AppState>) -> Json<ApiResponse<usize>> {
    let cleared = state.alerts.clear_resolved().await;

    Json(ApiResponse::success_with_message(
        cleared,
        format!("Se limpiaron {} alertas resueltas", cleared),
    ))
}
