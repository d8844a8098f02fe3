mod common;

use serde_json::json;
use smart_traffic_client::api::{EmergencyRequest, OptimizeRequest};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{client_for, init_logger};

fn envelope(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "success",
        "data": data,
        "timestamp": "2024-01-01T12:00:00"
    }))
}

#[tokio::test]
async fn traffic_status_reads_envelope() {
    init_logger();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/traffic/status"))
        .respond_with(envelope(json!({"system_stats": {"active_intersections": 3}})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server).traffic().status().await.unwrap();
    assert_eq!(response.data.status.as_deref(), Some("success"));
    assert_eq!(
        response.data.data.unwrap()["system_stats"]["active_intersections"],
        3
    );
}

#[tokio::test]
async fn traffic_status_cached_hits_backend_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/traffic/status"))
        .respond_with(envelope(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let traffic = client_for(&server).traffic();
    traffic.status_cached().await.unwrap();
    traffic.status_cached().await.unwrap();
}

#[tokio::test]
async fn optimize_posts_intersection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/traffic/optimize"))
        .and(body_json(json!({"intersection_id": "intersection_2"})))
        .respond_with(envelope(json!({"intersection_id": "intersection_2"})))
        .expect(1)
        .mount(&server)
        .await;

    let request = OptimizeRequest {
        intersection_id: Some("intersection_2".to_string()),
    };
    client_for(&server).traffic().optimize(&request).await.unwrap();
}

#[tokio::test]
async fn optimize_without_intersection_sends_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/traffic/optimize"))
        .and(body_json(json!({})))
        .respond_with(envelope(json!({"intersection_id": "all"})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .traffic()
        .optimize(&OptimizeRequest::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn analytics_and_emergency() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/traffic/analytics"))
        .respond_with(envelope(json!({"daily_stats": {}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/traffic/emergency"))
        .and(body_json(json!({"type": "general"})))
        .respond_with(envelope(json!({"status": "activated"})))
        .expect(1)
        .mount(&server)
        .await;

    let traffic = client_for(&server).traffic();
    traffic.analytics().await.unwrap();
    let response = traffic.emergency(&EmergencyRequest::default()).await.unwrap();
    assert_eq!(response.data.data.unwrap()["status"], "activated");
}

#[tokio::test]
async fn location_endpoints_use_expected_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/locations"))
        .respond_with(envelope(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/locations"))
        .and(body_json(json!({"name": "Main & 1st"})))
        .respond_with(envelope(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/locations/7"))
        .respond_with(envelope(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/locations/7"))
        .respond_with(envelope(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let locations = client_for(&server).locations();
    locations.list().await.unwrap();
    locations.create(&json!({"name": "Main & 1st"})).await.unwrap();
    locations.update(7, &json!({"name": "Main & 2nd"})).await.unwrap();
    locations.delete(7).await.unwrap();
}

#[tokio::test]
async fn health_and_service_info() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "version": "1.0.0",
            "services": {"database": "connected", "traffic_engine": "running"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Smart Traffic Management API",
            "endpoints": {"health": "/api/health"}
        })))
        .mount(&server)
        .await;

    let system = client_for(&server).system();
    let health = system.health().await.unwrap().data;
    assert!(health.is_healthy());
    assert_eq!(health.services["database"], "connected");

    let info = system.info().await.unwrap().data;
    assert_eq!(info.message.as_deref(), Some("Smart Traffic Management API"));
    assert_eq!(info.endpoints["health"], "/api/health");
}

#[tokio::test]
async fn password_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/forgot-password"))
        .and(body_json(json!({"email": "ops@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "sent"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/change-password"))
        .and(body_json(json!({"currentPassword": "old", "newPassword": "new"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "changed"})))
        .expect(1)
        .mount(&server)
        .await;

    let auth = client_for(&server).auth();
    auth.forgot_password("ops@example.com").await.unwrap();
    auth.change_password(&smart_traffic_client::auth::PasswordChange {
        current_password: "old".to_string(),
        new_password: "new".to_string(),
    })
    .await
    .unwrap();
}
