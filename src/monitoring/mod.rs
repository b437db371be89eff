//! Monitoreo
//!
//! Métricas de requests y eventos de negocio, y alertas derivadas de ellas.

pub mod alerts;
pub mod metrics_collector;

pub use alerts::{Alert, AlertLevel, AlertManager, AlertStats};
pub use metrics_collector::{MetricsCollector, MetricsSummary, UNMATCHED_ROUTE};
