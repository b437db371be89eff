use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

use yoga_scheduler::cache::{KeyValueStore, MemoryStore};
use yoga_scheduler::config::EnvironmentConfig;
use yoga_scheduler::create_app;
use yoga_scheduler::models::CreateClassRequest;
use yoga_scheduler::monitoring::{AlertLevel, MetricsCollector};
use yoga_scheduler::repositories::YogaRepository;
use yoga_scheduler::state::AppState;

fn create_test_state(testing: bool) -> (Arc<MemoryStore>, AppState) {
    let config = EnvironmentConfig {
        testing,
        ..EnvironmentConfig::default()
    };
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        config,
        store.clone(),
        YogaRepository::with_default_instructors(),
        MetricsCollector::new().unwrap(),
    );
    (store, state)
}

fn create_test_app() -> (Arc<MemoryStore>, AppState, Router) {
    let (store, state) = create_test_state(false);
    let app = create_app(state.clone());
    (store, state, app)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn class_payload(name: &str, max_capacity: u32) -> Value {
    json!({
        "name": name,
        "description": "Clase de prueba",
        "instructor_id": 1,
        "style": "hatha",
        "level": "beginner",
        "duration_minutes": 60,
        "max_capacity": max_capacity,
        "price": 15.0,
        "schedule_time": "08:30:00",
        "week_days": [1, 3, 5]
    })
}

async fn create_class(app: &Router, name: &str, max_capacity: u32) -> u64 {
    let response = send(
        app,
        Method::POST,
        "/api/v1/classes",
        Some(class_payload(name, max_capacity)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["data"]["id"].as_u64().unwrap()
}

fn limited_app(trust_forwarded_for: bool) -> Router {
    let config = EnvironmentConfig {
        rate_limit_requests: 2,
        trust_forwarded_for,
        ..EnvironmentConfig::default()
    };
    let state = AppState::new(
        config,
        Arc::new(MemoryStore::new()),
        YogaRepository::with_default_instructors(),
        MetricsCollector::new().unwrap(),
    );
    create_app(state)
}

#[tokio::test]
async fn test_root_and_health_check() {
    let (_, _, app) = create_test_app();

    let response = send(&app, Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "status": "healthy" }));

    let response = send(&app, Method::GET, "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "active");
}

#[tokio::test]
async fn test_create_and_get_class() {
    let (_, _, app) = create_test_app();

    let response = send(
        &app,
        Method::POST,
        "/api/v1/classes",
        Some(class_payload("Hatha matutino", 10)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["active"], true);
    let id = body["data"]["id"].as_u64().unwrap();

    let response = send(&app, Method::GET, &format!("/api/v1/classes/{}", id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "Hatha matutino");
    assert_eq!(body["available_spots"], 10);
    assert_eq!(body["instructor"]["name"], "Ana García");
}

#[tokio::test]
async fn test_create_class_validation() {
    let (_, _, app) = create_test_app();

    let mut payload = class_payload("Muy corta", 10);
    payload["duration_minutes"] = json!(10);
    let response = send(&app, Method::POST, "/api/v1/classes", Some(payload)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");

    let mut payload = class_payload("Sin instructor", 10);
    payload["instructor_id"] = json!(99);
    let response = send(&app, Method::POST, "/api/v1/classes", Some(payload)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_is_cached_until_invalidated() {
    let (store, state, app) = create_test_app();
    create_class(&app, "Vinyasa", 12).await;

    let response = send(&app, Method::GET, "/api/v1/classes", None).await;
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
    assert!(!store.is_empty());

    // Escritura directa al repositorio: el listado sigue sirviendo la copia cacheada
    let request: CreateClassRequest = serde_json::from_value(class_payload("Directa", 5)).unwrap();
    state.repository.create_class(request).await;
    let response = send(&app, Method::GET, "/api/v1/classes", None).await;
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

    assert_eq!(state.cache.invalidate_pattern("list_classes").await, 1);
    let response = send(&app, Method::GET, "/api/v1/classes", None).await;
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 2);

    // Crear por la API invalida el listado
    create_class(&app, "Ashtanga", 8).await;
    let response = send(&app, Method::GET, "/api/v1/classes", None).await;
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 3);

    let response = send(&app, Method::GET, "/api/v1/classes?level=advanced", None).await;
    assert!(json_body(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_missing_class_returns_404() {
    let (store, _, app) = create_test_app();

    for _ in 0..2 {
        let response = send(&app, Method::GET, "/api/v1/classes/999", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // El 404 no quedó en cache
    assert!(store.keys("yoga_class_detail*").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_class_invalidates_detail() {
    let (_, _, app) = create_test_app();
    let id = create_class(&app, "Restaurativa", 10).await;
    let uri = format!("/api/v1/classes/{}", id);

    let response = send(&app, Method::GET, &uri, None).await;
    assert_eq!(json_body(response).await["price"], 15.0);

    let response = send(&app, Method::PUT, &uri, Some(json!({ "price": 20.0 }))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::GET, &uri, None).await;
    assert_eq!(json_body(response).await["price"], 20.0);

    let response = send(
        &app,
        Method::PUT,
        "/api/v1/classes/999",
        Some(json!({ "price": 20.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_rejects_blank_name() {
    let (_, _, app) = create_test_app();
    let id = create_class(&app, "Ashtanga", 10).await;
    let uri = format!("/api/v1/classes/{}", id);

    let response = send(&app, Method::PUT, &uri, Some(json!({ "name": "   " }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, Method::GET, &uri, None).await;
    assert_eq!(json_body(response).await["name"], "Ashtanga");
}

#[tokio::test]
async fn test_reserve_until_full() {
    let (_, _, app) = create_test_app();
    let id = create_class(&app, "Kundalini", 2).await;
    let detail = format!("/api/v1/classes/{}", id);

    let response = send(&app, Method::GET, &detail, None).await;
    assert_eq!(json_body(response).await["available_spots"], 2);

    for user_id in 1..=2 {
        let response = send(
            &app,
            Method::POST,
            &format!("/api/v1/classes/{}/reserve?user_id={}", id, user_id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["status"], "confirmed");
        assert_eq!(body["data"]["user_id"], user_id);
    }

    // La reserva invalidó el detalle cacheado
    let response = send(&app, Method::GET, &detail, None).await;
    assert_eq!(json_body(response).await["available_spots"], 0);

    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/classes/{}/reserve?user_id=3", id),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "Class full");

    let response = send(
        &app,
        Method::POST,
        "/api/v1/classes/999/reserve?user_id=1",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reserve_inactive_class() {
    let (_, _, app) = create_test_app();
    let id = create_class(&app, "Cerrada", 5).await;

    send(
        &app,
        Method::PUT,
        &format!("/api/v1/classes/{}", id),
        Some(json!({ "active": false })),
    )
    .await;

    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/classes/{}/reserve?user_id=1", id),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "Class not available");
}

#[tokio::test]
async fn test_cache_metrics_endpoint() {
    let (store, _, app) = create_test_app();
    create_class(&app, "Hatha", 10).await;
    send(&app, Method::GET, "/api/v1/classes", None).await;

    let response = send(&app, Method::GET, "/api/v1/metrics/cache", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_keys"], 1);
    assert_eq!(body["prefix"], "yoga_");
    assert_eq!(body["status"], "active");

    store.set_available(false);
    let response = send(&app, Method::GET, "/api/v1/metrics/cache", None).await;
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn test_api_keeps_serving_without_store() {
    let (store, _, app) = create_test_app();
    store.set_available(false);

    let id = create_class(&app, "Sin Redis", 3).await;
    let response = send(&app, Method::GET, &format!("/api/v1/classes/{}", id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_process_time_header_and_request_metrics() {
    let (_, state, app) = create_test_app();

    let response = send(&app, Method::GET, "/health", None).await;
    let header = response.headers().get("x-process-time").unwrap();
    assert!(header.to_str().unwrap().parse::<f64>().unwrap() >= 0.0);

    send(&app, Method::GET, "/api/v1/classes/999", None).await;

    let summary = state.metrics.get_metrics_summary().await;
    assert_eq!(summary.requests_last_hour, 2);
    assert_eq!(summary.errors_last_hour, 1);

    let response = send(&app, Method::GET, "/api/v1/metrics/prometheus", None).await;
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("yoga_requests_total"));
}

#[tokio::test]
async fn test_prometheus_labels_use_route_template() {
    let (_, state, app) = create_test_app();

    for i in 0..200 {
        let uri = format!("/api/v1/classes/{}", 1_000_000 + i);
        let response = send(&app, Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let text = state.metrics.export_prometheus().unwrap();
    let class_series: Vec<&str> = text
        .lines()
        .filter(|line| line.starts_with("yoga_requests_total{"))
        .filter(|line| line.contains("/api/v1/classes"))
        .collect();
    assert_eq!(class_series.len(), 1);
    assert!(class_series[0].contains("path=\"/api/v1/classes/:id\""));
    assert!(class_series[0].ends_with(" 200"));
    assert!(!text.contains("1000000"));

    // El resumen en memoria cuenta cada request
    let summary = state.metrics.get_metrics_summary().await;
    assert_eq!(summary.requests_last_hour, 200);
}

#[tokio::test]
async fn test_rate_limit_through_app() {
    let app = limited_app(false);

    for _ in 0..2 {
        let response = send(&app, Method::GET, "/api/v1/classes", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = send(&app, Method::GET, "/api/v1/classes", None).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // /health está exento
    for _ in 0..5 {
        let response = send(&app, Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

/// Petición desde un peer fijo con un `X-Forwarded-For` distinto cada vez
async fn send_from_peer(app: &Router, peer: SocketAddr, forwarded_for: &str) -> Response {
    let mut request = Request::builder()
        .uri("/api/v1/classes")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::empty())
        .unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    app.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn test_rotating_forwarded_header_does_not_bypass_limit() {
    let app = limited_app(false);
    let peer: SocketAddr = "198.51.100.4:40000".parse().unwrap();

    let mut allowed = 0;
    for i in 0..50 {
        let response = send_from_peer(&app, peer, &format!("203.0.113.{}", i)).await;
        if response.status() == StatusCode::OK {
            allowed += 1;
        } else {
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }
    }
    assert_eq!(allowed, 2);

    // Otro peer tiene su propio contador
    let other: SocketAddr = "198.51.100.5:40000".parse().unwrap();
    let response = send_from_peer(&app, other, "203.0.113.1").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_header_used_only_when_trusted() {
    let app = limited_app(true);
    let peer: SocketAddr = "10.0.0.2:40000".parse().unwrap();

    // Detrás de un proxy cada cliente real llega en X-Forwarded-For
    for i in 0..5 {
        let response = send_from_peer(&app, peer, &format!("203.0.113.{}, 10.0.0.2", i)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    for _ in 0..2 {
        send_from_peer(&app, peer, "203.0.113.77").await;
    }
    let response = send_from_peer(&app, peer, "203.0.113.77").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_testing_mode_skips_middlewares() {
    let (store, state) = create_test_state(true);
    let app = create_app(state);

    let response = send(&app, Method::GET, "/status", None).await;
    assert!(response.headers().get("x-process-time").is_none());
    assert_eq!(
        json_body(response).await,
        json!({ "status": "healthy", "mode": "testing" })
    );

    send(&app, Method::GET, "/api/v1/classes", None).await;
    assert!(store.keys("rate_limit:*").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_alerts_lifecycle() {
    let (_, state, app) = create_test_app();
    state
        .alerts
        .add_alert("High response time", "lento", AlertLevel::High, "performance")
        .await;

    let response = send(&app, Method::GET, "/api/v1/alerts", None).await;
    let body = json_body(response).await;
    assert_eq!(body["data"]["stats"]["total_active"], 1);
    assert_eq!(body["data"]["stats"]["by_level"]["high"], 1);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/alerts/resolve?alert_title=High%20response%20time",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/alerts/resolve?alert_title=High%20response%20time",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, Method::DELETE, "/api/v1/alerts", None).await;
    assert_eq!(json_body(response).await["data"], 1);
}

#[tokio::test]
async fn test_status_raises_business_alert() {
    let (_, state, app) = create_test_app();
    create_class(&app, "Vacía", 10).await;

    let response = send(&app, Method::GET, "/status", None).await;
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");

    let titles: Vec<String> = state
        .alerts
        .active_alerts()
        .await
        .into_iter()
        .map(|alert| alert.title)
        .collect();
    assert!(titles.contains(&"Low class occupancy".to_string()));
}
