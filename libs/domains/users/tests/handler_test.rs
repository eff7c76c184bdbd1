//! Handler tests for the Users domain
//!
//! Drive the router with in-memory collaborators and check status codes,
//! bodies, `_links` and the events published along the way.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain_users::*;
use http_body_util::BodyExt;
use notification_common::{EventType, InMemoryEventPublisher, NotificationEvent};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()

fn app() -> (Router, InMemoryEventPublisher) {
    let publisher = InMemoryEventPublisher::new();
    let service = UserService::new(InMemoryUserRepository::new(), Arc::new(publisher.clone()));
    (handlers::router(service), publisher)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
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

fn jane() -> Value {
    json!({"name": "Jane Doe", "email": "jane@example.com", "age": 28})
}

#[tokio::test]
async fn test_create_user_returns_201_with_links_and_publishes() {
    let (app, publisher) = app();

    let response = app
        .oneshot(json_request("POST", "/users/create", jane()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["email"], "jane@example.com");
    assert_eq!(body["_links"]["self"]["href"], "/users/1");
    assert_eq!(body["_links"]["users"]["href"], "/users");

    assert_eq!(
        publisher.published().await,
        vec![NotificationEvent::created("jane@example.com")]
    );
}

#[tokio::test]
async fn test_create_user_validation_message_format() {
    let (app, publisher) = app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/create",
            json!({"name": "R2D2", "email": "jane@example.com", "age": 200}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("age - Age must be between 0 and 150;"));
    assert!(message.contains("name - Name may only contain letters, spaces and hyphens;"));
    assert!(body["timestamp"].is_string());
    assert!(publisher.published().await.is_empty());
}

#[tokio::test]
async fn test_create_user_with_taken_email_returns_400() {
    let (app, _) = app();

    let first = app
        .clone()
        .oneshot(json_request("POST", "/users/create", jane()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(json_request("POST", "/users/create", jane()))
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(second).await["message"], "Email already taken");
}

#[tokio::test]
async fn test_list_users_empty_returns_404() {
    let (app, _) = app();

    let response = app.oneshot(empty_request("GET", "/users")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["message"], "No users found");
}

#[tokio::test]
async fn test_list_users_returns_collection() {
    let (app, _) = app();
    app.clone()
        .oneshot(json_request("POST", "/users/create", jane()))
        .await
        .unwrap();

    let response = app.oneshot(empty_request("GET", "/users")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
    assert_eq!(body["_links"]["create"]["href"], "/users/create");
}

#[tokio::test]
async fn test_get_user_not_found_and_bad_id() {
    let (app, _) = app();

    let missing = app
        .clone()
        .oneshot(empty_request("GET", "/users/99"))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert!(
        json_body(missing).await["message"]
            .as_str()
            .unwrap()
            .contains("not found")
    );

    let bad = app.oneshot(empty_request("GET", "/users/abc")).await.unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_user_returns_200() {
    let (app, publisher) = app();
    app.clone()
        .oneshot(json_request("POST", "/users/create", jane()))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/users/update/1",
            json!({"name": "Jane Smith", "email": "jane.smith@example.com", "age": 29}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "Jane Smith");
    assert_eq!(body["_links"]["delete"]["href"], "/users/delete/1");
    assert_eq!(publisher.published().await.len(), 1);
}

#[tokio::test]
async fn test_delete_user_returns_204_and_publishes_deleted() {
    let (app, publisher) = app();
    app.clone()
        .oneshot(json_request("POST", "/users/create", jane()))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/users/delete/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let events = publisher.published().await;
    assert_eq!(events[1].event_type, EventType::Deleted);
    assert_eq!(events[1].email, "jane@example.com");

    let again = app
        .oneshot(empty_request("DELETE", "/users/delete/1"))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_broker_outage_does_not_fail_create() {
    let publisher = InMemoryEventPublisher::failing();
    let service = UserService::new(InMemoryUserRepository::new(), Arc::new(publisher.clone()));
    let app = handlers::router(service);

    let response = app
        .oneshot(json_request("POST", "/users/create", jane()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(publisher.published().await.is_empty());
}
