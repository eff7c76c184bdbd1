//! Handler tests for the Notifications domain

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain_notifications::*;
use http_body_util::BodyExt;
use resilience::{CircuitBreaker, CircuitBreakerConfig, SlidingWindow};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // For oneshot()

type Service = NotificationService<InMemoryNotificationRepository>;

fn service(transport: RecordingMailTransport) -> Service {
    NotificationService::new(
        InMemoryNotificationRepository::new(),
        Arc::new(transport),
        MailComposer::new("noreply@example.com"),
    )
}

fn app(transport: RecordingMailTransport) -> Router {
    handlers::router(Arc::new(service(transport)))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn send_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/notifications/send")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_send_returns_201_and_records_notification() {
    let transport = RecordingMailTransport::new();
    let app = app(transport.clone());

    let response = app
        .clone()
        .oneshot(send_request(json!({"email": "a@b.com", "eventType": "CREATED"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["email"], "a@b.com");
    assert_eq!(body["eventType"], "CREATED");
    assert_eq!(body["_links"]["self"]["href"], "/api/notifications/send");
    assert_eq!(transport.sent().await.len(), 1);

    let record = app
        .oneshot(empty_request("GET", "/notifications/1"))
        .await
        .unwrap();
    assert_eq!(record.status(), StatusCode::OK);
    let body = json_body(record).await;
    assert_eq!(body["status"], "SENT");
    assert_eq!(body["_links"]["delete"]["href"], "/notifications/delete/1");
}

#[tokio::test]
async fn test_send_rejects_invalid_events() {
    let app = app(RecordingMailTransport::new());

    let blank = app
        .clone()
        .oneshot(send_request(json!({"email": "", "eventType": "CREATED"})))
        .await
        .unwrap();
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    assert!(
        json_body(blank).await["message"]
            .as_str()
            .unwrap()
            .contains("email - Email must not be empty;")
    );

    let unknown = app
        .oneshot(send_request(json!({"email": "a@b.com", "eventType": "UPDATED"})))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_send_with_open_mail_breaker_returns_400() {
    let breaker = CircuitBreaker::new(
        "mail-handler-test",
        CircuitBreakerConfig::mail()
            .with_sliding_window(SlidingWindow::Count(2))
            .with_minimum_calls(2)
            .with_wait_in_open(Duration::from_secs(60)),
    );
    for _ in 0..2 {
        let _ = breaker
            .call(|| async { Err::<(), _>("connection refused") })
            .await;
    }
    let transport = RecordingMailTransport::new();
    let app = handlers::router(Arc::new(service(transport.clone()).with_mail_breaker(breaker)));

    let response = app
        .oneshot(send_request(json!({"email": "a@b.com", "eventType": "DELETED"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        json_body(response).await["message"]
            .as_str()
            .unwrap()
            .contains("circuit breaker")
    );
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_send_with_failing_transport_still_returns_201() {
    let transport = RecordingMailTransport::failing();
    let app = app(transport.clone());
    let event = json!({"email": "a@b.com", "eventType": "DELETED"});

    for _ in 0..4 {
        let response = app.clone().oneshot(send_request(event.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    assert_eq!(transport.attempts(), 4);
}

#[tokio::test]
async fn test_list_notifications() {
    let app = app(RecordingMailTransport::failing());

    let empty = app
        .clone()
        .oneshot(empty_request("GET", "/notifications"))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(empty).await["message"], "No notifications found");

    app.clone()
        .oneshot(send_request(json!({"email": "a@b.com", "eventType": "CREATED"})))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request("GET", "/notifications"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["status"], "FAILED");
    assert_eq!(body["_links"]["self"]["href"], "/notifications");
}

#[tokio::test]
async fn test_get_notification_not_found_and_bad_id() {
    let app = app(RecordingMailTransport::new());

    let missing = app
        .clone()
        .oneshot(empty_request("GET", "/notifications/42"))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert!(
        json_body(missing).await["message"]
            .as_str()
            .unwrap()
            .contains("not found")
    );

    let bad = app
        .oneshot(empty_request("GET", "/notifications/abc"))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_notification() {
    let app = app(RecordingMailTransport::new());
    app.clone()
        .oneshot(send_request(json!({"email": "a@b.com", "eventType": "CREATED"})))
        .await
        .unwrap();

    let deleted = app
        .clone()
        .oneshot(empty_request("DELETE", "/notifications/delete/1"))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let again = app
        .oneshot(empty_request("DELETE", "/notifications/delete/1"))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}
