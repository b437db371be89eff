//! API del centro de yoga
//!
//! Clases, reservas y monitoreo sobre axum, con memoización y rate limiting
//! respaldados por un almacén clave/valor compartido (Redis o memoria).

pub mod cache;
pub mod config;
pub mod controllers;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod monitoring;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod utils;

use axum::{middleware::from_fn_with_state, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    cors_layer, monitoring_middleware, performance_middleware, rate_limit_middleware,
};
use crate::state::AppState;

/// Construir el router completo de la aplicación
///
/// Orden de los middlewares (de afuera hacia adentro): monitoreo, performance,
/// rate limiting. En modo testing no se monta ninguno de los tres.
pub fn create_app(state: AppState) -> Router {
    let mut app = Router::new()
        .merge(routes::create_system_router())
        .nest("/api/v1/classes", routes::create_class_router())
        .nest("/api/v1/alerts", routes::create_alert_router());

    if !state.config.testing {
        app = app
            .layer(from_fn_with_state(
                state.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(from_fn_with_state(state.clone(), performance_middleware))
            .layer(from_fn_with_state(state.clone(), monitoring_middleware));
    }

    app.layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
