//! Recolector de métricas
//!
//! Guarda en memoria los requests, errores y eventos de la última hora y los
//! refleja en un registro Prometheus. Una tarea de fondo purga lo antiguo.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Ventana de retención de métricas
const RETENTION_SECONDS: i64 = 3600;
/// Intervalo de la limpieza de fondo
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);
/// Etiqueta `path` de Prometheus cuando ninguna ruta coincidió
pub const UNMATCHED_ROUTE: &str = "unmatched";

#[derive(Debug, Clone, Serialize)]
pub struct RequestMetric {
    pub timestamp: DateTime<Utc>,
    pub path: String,
    pub method: String,
    pub status_code: u16,
    pub response_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorMetric {
    pub timestamp: DateTime<Utc>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventMetric {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub metadata: serde_json::Value,
}

/// Resumen de la última hora
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSummary {
    pub requests_last_hour: usize,
    pub errors_last_hour: usize,
    pub avg_response_time: f64,
    pub max_response_time: f64,
    pub error_rate: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MetricsData {
    requests: Vec<RequestMetric>,
    errors: Vec<ErrorMetric>,
    events: Vec<EventMetric>,
}

/// Colectores Prometheus de la aplicación
struct PrometheusMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    errors_total: IntCounterVec,
    events_total: IntCounterVec,
}

impl PrometheusMetrics {
    fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("yoga_requests_total", "Total number of API requests"),
            &["method", "path", "status_code"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("yoga_request_duration_seconds", "Request duration in seconds")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "path"],
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new("yoga_errors_total", "Total number of failed requests"),
            &["path", "kind"],
        )?;
        let events_total = IntCounterVec::new(
            Opts::new("yoga_events_total", "Business events"),
            &["event_type"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(events_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            errors_total,
            events_total,
        })
    }
}

#[derive(Clone)]
pub struct MetricsCollector {
    data: Arc<RwLock<MetricsData>>,
    prometheus: Arc<PrometheusMetrics>,
    cleanup_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl MetricsCollector {
    pub fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            data: Arc::new(RwLock::new(MetricsData::default())),
            prometheus: Arc::new(PrometheusMetrics::new()?),
            cleanup_task: Arc::new(Mutex::new(None)),
        })
    }

    /// Iniciar la limpieza periódica de métricas
    pub async fn start(&self) {
        let mut task = self.cleanup_task.lock().await;
        if task.is_some() {
            return;
        }

        let collector = self.clone();
        *task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            // El primer tick es inmediato
            interval.tick().await;
            loop {
                interval.tick().await;
                collector.cleanup_old_metrics(Utc::now()).await;
            }
        }));
        info!("📊 Metrics collector started");
    }

    /// Detener la limpieza periódica
    pub async fn stop(&self) {
        if let Some(task) = self.cleanup_task.lock().await.take() {
            task.abort();
        }
        info!("📊 Metrics collector stopped");
    }

    /// Registrar métrica de request. Prometheus se etiqueta con la plantilla
    /// de la ruta (`route`), los registros en memoria guardan el path real
    pub async fn record_request(
        &self,
        path: &str,
        route: &str,
        method: &str,
        status_code: u16,
        response_time: f64,
    ) {
        let status = status_code.to_string();
        self.prometheus
            .requests_total
            .with_label_values(&[method, route, &status])
            .inc();
        self.prometheus
            .request_duration
            .with_label_values(&[method, route])
            .observe(response_time);

        self.data.write().await.requests.push(RequestMetric {
            timestamp: Utc::now(),
            path: path.to_string(),
            method: method.to_string(),
            status_code,
            response_time,
        });
    }

    /// Registrar error HTTP
    pub async fn record_error(&self, path: &str, route: &str, status_code: u16, method: &str) {
        self.prometheus
            .errors_total
            .with_label_values(&[route, "http"])
            .inc();

        self.data.write().await.errors.push(ErrorMetric {
            timestamp: Utc::now(),
            path: path.to_string(),
            status_code: Some(status_code),
            method: Some(method.to_string()),
            exception_type: None,
        });
    }

    /// Registrar fallo interno
    pub async fn record_exception(&self, path: &str, route: &str, exception_type: &str) {
        self.prometheus
            .errors_total
            .with_label_values(&[route, exception_type])
            .inc();

        self.data.write().await.errors.push(ErrorMetric {
            timestamp: Utc::now(),
            path: path.to_string(),
            status_code: None,
            method: None,
            exception_type: Some(exception_type.to_string()),
        });
    }

    /// Registrar evento de negocio
    pub async fn record_event(&self, event_type: &str, metadata: serde_json::Value) {
        self.prometheus
            .events_total
            .with_label_values(&[event_type])
            .inc();

        debug!("📌 Evento {}: {}", event_type, metadata);
        self.data.write().await.events.push(EventMetric {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            metadata,
        });
    }

    /// Eventos registrados dentro de la ventana de retención
    pub async fn events(&self) -> Vec<EventMetric> {
        self.data.read().await.events.clone()
    }

    /// Eliminar métricas anteriores a `now - 1h`
    pub async fn cleanup_old_metrics(&self, now: DateTime<Utc>) {
        let cutoff = now - ChronoDuration::seconds(RETENTION_SECONDS);
        let mut data = self.data.write().await;
        data.requests.retain(|m| m.timestamp > cutoff);
        data.errors.retain(|m| m.timestamp > cutoff);
        data.events.retain(|m| m.timestamp > cutoff);
    }

    /// Obtener resumen de métricas
    pub async fn get_metrics_summary(&self) -> MetricsSummary {
        self.summary_at(Utc::now()).await
    }

    pub async fn summary_at(&self, now: DateTime<Utc>) -> MetricsSummary {
        let cutoff = now - ChronoDuration::seconds(RETENTION_SECONDS);
        let data = self.data.read().await;

        let response_times: Vec<f64> = data
            .requests
            .iter()
            .filter(|r| r.timestamp > cutoff)
            .map(|r| r.response_time)
            .collect();
        let errors = data.errors.iter().filter(|e| e.timestamp > cutoff).count();

        let (avg, max) = if response_times.is_empty() {
            (0.0, 0.0)
        } else {
            let sum: f64 = response_times.iter().sum();
            let max = response_times.iter().cloned().fold(f64::MIN, f64::max);
            (sum / response_times.len() as f64, max)
        };

        MetricsSummary {
            requests_last_hour: response_times.len(),
            errors_last_hour: errors,
            avg_response_time: round3(avg),
            max_response_time: round3(max),
            error_rate: errors as f64 / response_times.len().max(1) as f64,
            timestamp: now,
        }
    }

    /// Exportar en formato de texto Prometheus
    pub fn export_prometheus(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.prometheus.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
