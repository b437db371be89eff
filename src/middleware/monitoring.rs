//! Middleware de monitoreo
//!
//! Registra como error toda respuesta con status >= 400, y como fallo interno
//! las respuestas 5xx que traen un código de error de la aplicación.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::error;

use super::performance::route_label;
use crate::state::AppState;
use crate::utils::errors::ErrorCode;

pub async fn monitoring_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let route = route_label(&request);
    let method = request.method().to_string();

    let response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        state.metrics.record_error(&path, &route, status.as_u16(), &method).await;
    }

    if status.is_server_error() {
        if let Some(ErrorCode(code)) = response.extensions().get::<ErrorCode>() {
            error!("❌ Error no manejado en {}: {}", path, code);
            state.metrics.record_exception(&path, &route, code).await;
        }
    }

    response
}
