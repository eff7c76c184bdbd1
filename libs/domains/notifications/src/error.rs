use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification with id {0} not found")]
    NotFound(i64),

    #[error("No notifications found")]
    NoNotifications,

    /// Open mail breaker, or the send-and-record step could not complete
    #[error("Mail operation failed: {0}")]
    MailOperation(String),

    /// Store failure or open notification-db breaker
    #[error("Database operation failed: {0}")]
    DatabaseOperation(String),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(_) | NotificationError::NoNotifications => {
                AppError::NotFound(err.to_string())
            }
            NotificationError::MailOperation(_) | NotificationError::DatabaseOperation(_) => {
                AppError::ServiceUnavailable(err.to_string())
            }
        }
    }
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
