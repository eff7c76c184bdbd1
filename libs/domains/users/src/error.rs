use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User with id {0} not found")]
    NotFound(i64),

    #[error("No users found")]
    NoUsers,

    #[error("Email already taken")]
    EmailTaken(String),

    /// Store failure or open user-db breaker
    #[error("Database operation failed: {0}")]
    DatabaseOperation(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    /// Whether the error reflects an unhealthy store rather than the request.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, UserError::DatabaseOperation(_))
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) | UserError::NoUsers => AppError::NotFound(err.to_string()),
            UserError::EmailTaken(_) => AppError::BadRequest(err.to_string()),
            UserError::DatabaseOperation(_) => AppError::ServiceUnavailable(err.to_string()),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
