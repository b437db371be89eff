//! Gestor de alertas
//!
//! Alertas de performance y de negocio, deduplicadas por título mientras la
//! alerta previa siga sin resolver y tenga menos de 5 minutos.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::metrics_collector::MetricsSummary;

/// Intervalo de supresión de alertas duplicadas
const SUPPRESSION_SECONDS: i64 = 300;
/// Tiempo de respuesta promedio máximo aceptable
const MAX_AVG_RESPONSE_TIME: f64 = 1.0;
/// Tasa de error máxima aceptable
const MAX_ERROR_RATE: f64 = 0.05;
/// Ocupación promedio mínima recomendada
const MIN_OCCUPANCY: f64 = 0.3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub level: AlertLevel,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertsByLevel {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertStats {
    pub total_active: usize,
    pub by_level: AlertsByLevel,
}

#[derive(Clone, Default)]
pub struct AlertManager {
    alerts: Arc<RwLock<Vec<Alert>>>,
}

impl AlertManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agregar una nueva alerta; retorna `false` si quedó suprimida
    pub async fn add_alert(&self, title: &str, message: &str, level: AlertLevel, source: &str) -> bool {
        self.add_alert_at(title, message, level, source, Utc::now()).await
    }

    pub async fn add_alert_at(
        &self,
        title: &str,
        message: &str,
        level: AlertLevel,
        source: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let mut alerts = self.alerts.write().await;

        let suppressed = alerts.iter().any(|alert| {
            alert.title == title
                && !alert.resolved
                && now - alert.timestamp < ChronoDuration::seconds(SUPPRESSION_SECONDS)
        });
        if suppressed {
            return false;
        }

        warn!("🚨 ALERTA {:?}: {} - {}", level, title, message);
        alerts.push(Alert {
            title: title.to_string(),
            message: message.to_string(),
            level,
            source: source.to_string(),
            timestamp: now,
            resolved: false,
        });
        true
    }

    /// Marcar alerta como resuelta
    pub async fn resolve_alert(&self, title: &str) -> bool {
        let mut alerts = self.alerts.write().await;
        match alerts.iter_mut().find(|a| a.title == title && !a.resolved) {
            Some(alert) => {
                alert.resolved = true;
                info!("✅ Alerta resuelta: {}", title);
                true
            }
            None => false,
        }
    }

    /// Obtener alertas activas (no resueltas)
    pub async fn active_alerts(&self) -> Vec<Alert> {
        self.alerts
            .read()
            .await
            .iter()
            .filter(|a| !a.resolved)
            .cloned()
            .collect()
    }

    pub async fn alert_stats(&self) -> AlertStats {
        let active = self.active_alerts().await;
        let count = |level: AlertLevel| active.iter().filter(|a| a.level == level).count();

        AlertStats {
            total_active: active.len(),
            by_level: AlertsByLevel {
                high: count(AlertLevel::High),
                medium: count(AlertLevel::Medium),
                low: count(AlertLevel::Low),
            },
        }
    }

    /// Limpiar alertas resueltas, retorna cuántas se eliminaron
    pub async fn clear_resolved(&self) -> usize {
        let mut alerts = self.alerts.write().await;
        let before = alerts.len();
        alerts.retain(|a| !a.resolved);
        before - alerts.len()
    }

    /// Revisar y generar alertas de performance
    pub async fn check_performance_alerts(&self, summary: &MetricsSummary) {
        if summary.avg_response_time > MAX_AVG_RESPONSE_TIME {
            self.add_alert(
                "High response time",
                &format!(
                    "API responding in {:.2}s (limit: {:.1}s)",
                    summary.avg_response_time, MAX_AVG_RESPONSE_TIME
                ),
                AlertLevel::High,
                "performance",
            )
            .await;
        }

        if summary.error_rate > MAX_ERROR_RATE {
            self.add_alert(
                "High error rate",
                &format!("Error rate of {:.1}% detected", summary.error_rate * 100.0),
                AlertLevel::High,
                "errors",
            )
            .await;
        }
    }

    /// Alertas de negocio a partir de la ocupación promedio de las clases
    pub async fn check_business_alerts(&self, average_occupancy: f64) {
        if average_occupancy < MIN_OCCUPANCY {
            self.add_alert(
                "Low class occupancy",
                &format!(
                    "Average occupancy: {:.0}% - recommended above {:.0}%",
                    average_occupancy * 100.0,
                    MIN_OCCUPANCY * 100.0
                ),
                AlertLevel::Medium,
                "business",
            )
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(avg_response_time: f64, error_rate: f64) -> MetricsSummary {
        MetricsSummary {
            requests_last_hour: 10,
            errors_last_hour: 0,
            avg_response_time,
            max_response_time: avg_response_time,
            error_rate,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_alerts_are_suppressed() {
        let manager = AlertManager::new();
        let now = Utc::now();

        assert!(manager.add_alert_at("Test", "uno", AlertLevel::High, "test", now).await);
        assert!(!manager.add_alert_at("Test", "dos", AlertLevel::High, "test", now).await);
        assert_eq!(manager.active_alerts().await.len(), 1);

        // Pasado el intervalo de supresión se vuelve a registrar
        let later = now + ChronoDuration::seconds(SUPPRESSION_SECONDS + 1);
        assert!(manager.add_alert_at("Test", "tres", AlertLevel::High, "test", later).await);
        assert_eq!(manager.active_alerts().await.len(), 2);
    }

    #[tokio::test]
    async fn test_resolved_alert_does_not_suppress() {
        let manager = AlertManager::new();
        manager.add_alert("Test", "uno", AlertLevel::Low, "test").await;
        assert!(manager.resolve_alert("Test").await);
        assert!(!manager.resolve_alert("Test").await);

        assert!(manager.add_alert("Test", "dos", AlertLevel::Low, "test").await);
        assert_eq!(manager.clear_resolved().await, 1);
        assert_eq!(manager.active_alerts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_alert_stats_by_level() {
        let manager = AlertManager::new();
        for i in 0..10 {
            let level = if i % 5 == 0 { AlertLevel::High } else { AlertLevel::Medium };
            manager.add_alert(&format!("Alert {}", i), "msg", level, "test").await;
        }

        let stats = manager.alert_stats().await;
        assert_eq!(stats.total_active, 10);
        assert_eq!(stats.by_level.high, 2);
        assert_eq!(stats.by_level.medium, 8);
        assert_eq!(stats.by_level.low, 0);
    }

    #[tokio::test]
    async fn test_performance_alerts() {
        let manager = AlertManager::new();
        manager.check_performance_alerts(&summary(0.2, 0.01)).await;
        assert!(manager.active_alerts().await.is_empty());

        manager.check_performance_alerts(&summary(1.5, 0.10)).await;
        let titles: Vec<String> = manager.active_alerts().await.into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["High response time", "High error rate"]);
    }

    #[tokio::test]
    async fn test_business_alerts() {
        let manager = AlertManager::new();
        manager.check_business_alerts(0.78).await;
        assert!(manager.active_alerts().await.is_empty());

        manager.check_business_alerts(0.1).await;
        let active = manager.active_alerts().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].level, AlertLevel::Medium);
        assert_eq!(active[0].source, "business");
    }
}
