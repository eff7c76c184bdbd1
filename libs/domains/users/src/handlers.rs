use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use axum_helpers::{ErrorResponse, IdPath, Links, ValidatedJson};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::UserResult;
use crate::models::{User, UserListResponse, UserRequest, UserResponse};
use crate::repository::UserRepository;
use crate::service::UserService;

const USERS_PATH: &str = "/users";

/// OpenAPI documentation for the Users API
#[derive(OpenApi)]
#[openapi(
    paths(list_users, get_user, create_user, update_user, delete_user),
    components(schemas(UserRequest, UserResponse, UserListResponse, ErrorResponse)),
    tags((name = "users", description = "User management endpoints"))
)]
pub struct ApiDoc;

/// Create the users router with all HTTP endpoints
pub fn router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route(USERS_PATH, get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/users/create", post(create_user))
        .route("/users/update/{id}", put(update_user))
        .route("/users/delete/{id}", delete(delete_user))
        .with_state(shared_service)
}

fn user_links(id: i64) -> Links {
    Links::new()
        .with("self", format!("{USERS_PATH}/{id}"))
        .with("users", USERS_PATH)
        .with("update", format!("{USERS_PATH}/update/{id}"))
        .with("delete", format!("{USERS_PATH}/delete/{id}"))
}

fn to_response(user: User) -> UserResponse {
    let links = user_links(user.id);
    UserResponse::new(user, links)
}

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = UserListResponse),
        (status = 404, description = "No users exist", body = ErrorResponse),
        (status = 503, description = "User database unavailable", body = ErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
) -> UserResult<Json<UserListResponse>> {
    let users = service.list_users().await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(to_response).collect(),
        links: Links::new()
            .with("self", USERS_PATH)
            .with("create", format!("{USERS_PATH}/create")),
    }))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    IdPath(id): IdPath,
) -> UserResult<Json<UserResponse>> {
    let user = service.get_user(id).await?;
    Ok(Json(to_response(user)))
}

/// Create a user and announce it
#[utoipa::path(
    post,
    path = "/users/create",
    tag = "users",
    request_body = UserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed or email taken", body = ErrorResponse),
        (status = 503, description = "User database unavailable", body = ErrorResponse)
    )
)]
async fn create_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    ValidatedJson(input): ValidatedJson<UserRequest>,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(to_response(user))))
}

/// Replace a user's name, email and age
#[utoipa::path(
    put,
    path = "/users/update/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation failed or email taken", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    IdPath(id): IdPath,
    ValidatedJson(input): ValidatedJson<UserRequest>,
) -> UserResult<Json<UserResponse>> {
    let user = service.update_user(id, input).await?;
    Ok(Json(to_response(user)))
}

/// Delete a user and announce it
#[utoipa::path(
    delete,
    path = "/users/delete/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    IdPath(id): IdPath,
) -> UserResult<impl IntoResponse> {
    service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
