use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use axum_helpers::{AppError, ErrorResponse, IdPath, Links, ValidatedJson};
use notification_common::NotificationEvent;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::{NotificationError, NotificationResult};
use crate::models::{NotificationListResponse, NotificationRecord, NotificationResponse, SendResponse};
use crate::repository::NotificationRepository;
use crate::service::NotificationService;

const NOTIFICATIONS_PATH: &str = "/notifications";
const SEND_PATH: &str = "/api/notifications/send";

/// OpenAPI documentation for the Notifications API
#[derive(OpenApi)]
#[openapi(
    paths(send_notification, list_notifications, get_notification, delete_notification),
    components(schemas(
        NotificationEvent,
        SendResponse,
        NotificationResponse,
        NotificationListResponse,
        ErrorResponse
    )),
    tags((name = "notifications", description = "Email notification endpoints"))
)]
pub struct ApiDoc;

/// Create the notifications router with all HTTP endpoints
pub fn router<R: NotificationRepository + 'static>(
    service: Arc<NotificationService<R>>,
) -> Router {
    Router::new()
        .route(SEND_PATH, post(send_notification))
        .route(NOTIFICATIONS_PATH, get(list_notifications))
        .route("/notifications/{id}", get(get_notification))
        .route("/notifications/delete/{id}", delete(delete_notification))
        .with_state(service)
}

fn to_response(record: NotificationRecord) -> NotificationResponse {
    let links = Links::new()
        .with("self", format!("{NOTIFICATIONS_PATH}/{}", record.id))
        .with("notifications", NOTIFICATIONS_PATH)
        .with("delete", format!("{NOTIFICATIONS_PATH}/delete/{}", record.id));
    NotificationResponse { record, links }
}

/// Send an email for the event and record the outcome
#[utoipa::path(
    post,
    path = "/api/notifications/send",
    tag = "notifications",
    request_body = NotificationEvent,
    responses(
        (status = 201, description = "Event processed", body = SendResponse),
        (status = 400, description = "Invalid event or mail service unavailable", body = ErrorResponse)
    )
)]
async fn send_notification<R: NotificationRepository>(
    State(service): State<Arc<NotificationService<R>>>,
    ValidatedJson(event): ValidatedJson<NotificationEvent>,
) -> Result<impl IntoResponse, AppError> {
    service.process(&event).await.map_err(|e| match e {
        NotificationError::MailOperation(_) => AppError::BadRequest(e.to_string()),
        other => other.into(),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(SendResponse {
            email: event.email,
            event_type: event.event_type,
            links: Links::new().with("self", SEND_PATH),
        }),
    ))
}

/// List all notification records
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    responses(
        (status = 200, description = "All notifications", body = NotificationListResponse),
        (status = 404, description = "No notifications exist", body = ErrorResponse),
        (status = 503, description = "Notification database unavailable", body = ErrorResponse)
    )
)]
async fn list_notifications<R: NotificationRepository>(
    State(service): State<Arc<NotificationService<R>>>,
) -> NotificationResult<Json<NotificationListResponse>> {
    let records = service.list_all().await?;

    Ok(Json(NotificationListResponse {
        notifications: records.into_iter().map(to_response).collect(),
        links: Links::new().with("self", NOTIFICATIONS_PATH),
    }))
}

/// Get a notification record by ID
#[utoipa::path(
    get,
    path = "/notifications/{id}",
    tag = "notifications",
    params(("id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification found", body = NotificationResponse),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
async fn get_notification<R: NotificationRepository>(
    State(service): State<Arc<NotificationService<R>>>,
    IdPath(id): IdPath,
) -> NotificationResult<Json<NotificationResponse>> {
    let record = service.find_by_id(id).await?;
    Ok(Json(to_response(record)))
}

/// Delete a notification record
#[utoipa::path(
    delete,
    path = "/notifications/delete/{id}",
    tag = "notifications",
    params(("id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
async fn delete_notification<R: NotificationRepository>(
    State(service): State<Arc<NotificationService<R>>>,
    IdPath(id): IdPath,
) -> NotificationResult<impl IntoResponse> {
    service.delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
