//! Middleware del sistema
//!
//! Este módulo contiene el middleware de CORS, rate limiting, medición de
//! performance y monitoreo de errores.

pub mod cors;
pub mod monitoring;
pub mod performance;
pub mod rate_limit;

pub use cors::*;
pub use monitoring::monitoring_middleware;
pub use performance::performance_middleware;
pub use rate_limit::*;
