mod common;

use axum::http::StatusCode;
use serde_json::json;
use urlshrink::application::services::ResolverStrategy;

#[tokio::test]
async fn test_stats_from_trusted_address() {
    let app = common::spawn_app();

    app.server
        .post("/")
        .add_header("Authorization", app.bearer("alice"))
        .text("https://practicum.yandex.ru/")
        .await
        .assert_status(StatusCode::CREATED);
    app.server
        .post("/")
        .add_header("Authorization", app.bearer("alice"))
        .text("https://example.com")
        .await
        .assert_status(StatusCode::CREATED);
    app.server
        .post("/")
        .add_header("Authorization", app.bearer("bob"))
        .text("https://rust-lang.org")
        .await
        .assert_status(StatusCode::CREATED);

    let response = app
        .server
        .get("/api/internal/stats")
        .add_header("X-Real-IP", "10.1.2.3")
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "urls": 3, "users": 2 }));
}

#[tokio::test]
async fn test_stats_empty_storage() {
    let app = common::spawn_app();

    let response = app
        .server
        .get("/api/internal/stats")
        .add_header("X-Real-IP", "10.0.0.1")
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "urls": 0, "users": 0 }));
}

#[tokio::test]
async fn test_stats_without_real_ip_is_forbidden() {
    let app = common::spawn_app();

    app.server
        .get("/api/internal/stats")
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_stats_from_outside_subnet_is_forbidden() {
    let app = common::spawn_app();

    app.server
        .get("/api/internal/stats")
        .add_header("X-Real-IP", "192.168.1.10")
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_stats_with_garbage_real_ip_is_forbidden() {
    let app = common::spawn_app();

    app.server
        .get("/api/internal/stats")
        .add_header("X-Real-IP", "not-an-ip")
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_stats_without_configured_subnet_is_forbidden() {
    let app = common::spawn_app_with(ResolverStrategy::Stateless, None);

    app.server
        .get("/api/internal/stats")
        .add_header("X-Real-IP", "10.0.0.1")
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
