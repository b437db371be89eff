use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use yoga_scheduler::cache::{CacheBackend, KeyValueStore, MemoryStore, RedisClient, TimeoutStore};
use yoga_scheduler::config::EnvironmentConfig;
use yoga_scheduler::monitoring::MetricsCollector;
use yoga_scheduler::repositories::YogaRepository;
use yoga_scheduler::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🧘 Centro de Yoga Paz Interior - API");
    info!("====================================");

    let config = EnvironmentConfig::from_env();
    info!("⚙️ Entorno: {}", config.environment);
    if config.is_development() && config.cors_origins.is_empty() {
        warn!("⚠️ CORS permisivo: ningún origen configurado en CORS_ORIGINS");
    }

    // Inicializar almacén clave/valor
    let backend: Arc<dyn KeyValueStore> = match config.cache.backend {
        CacheBackend::Redis => match RedisClient::new(&config.cache).await {
            Ok(client) => Arc::new(client),
            Err(e) => {
                error!("❌ Error conectando a Redis: {}", e);
                return Err(anyhow::anyhow!("Error de Redis: {}", e));
            }
        },
        CacheBackend::Memory => {
            warn!("⚠️ Usando almacén en memoria: cache y rate limiting no se comparten entre instancias");
            Arc::new(MemoryStore::new())
        }
    };
    let store: Arc<dyn KeyValueStore> = Arc::new(TimeoutStore::new(
        backend,
        Duration::from_millis(config.cache.store_timeout_ms),
    ));

    // Inicializar métricas
    let metrics = MetricsCollector::new()?;
    metrics.start().await;

    let addr: SocketAddr = config.server_url().parse()?;
    let repository = YogaRepository::with_default_instructors();
    let app_state = AppState::new(config, store, repository, metrics.clone());
    let app = yoga_scheduler::create_app(app_state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  / - Bienvenida");
    info!("   GET  /health - Health check");
    info!("   GET  /status - Estado del sistema y alertas");
    info!("🧘 Clases:");
    info!("   POST /api/v1/classes - Crear clase");
    info!("   GET  /api/v1/classes - Listar clases");
    info!("   GET  /api/v1/classes/:id - Obtener clase");
    info!("   PUT  /api/v1/classes/:id - Actualizar clase");
    info!("   POST /api/v1/classes/:id/reserve - Reservar cupo");
    info!("📊 Monitoreo:");
    info!("   GET  /api/v1/metrics - Dashboard de métricas");
    info!("   GET  /api/v1/metrics/cache - Estadísticas del cache");
    info!("   GET  /api/v1/metrics/prometheus - Exportación Prometheus");
    info!("   GET|POST|DELETE /api/v1/alerts - Alertas");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    metrics.stop().await;

    if let Err(e) = served {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
