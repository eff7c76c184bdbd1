//! Notifications Domain
//!
//! Turns user events into emails and keeps an audit record of every attempt.
//!
//! ```text
//! user-event topic ──► UserEventHandler ──► NotificationService::process
//!                                              │  compose (MailComposer)
//!                                              │  send    (MailTransport)
//!                                              └─ record  (NotificationRepository)
//!
//! REST ──► handlers ──► NotificationService::{list_all, find_by_id, delete_by_id}
//! ```
//!
//! `process` runs behind the mail circuit breaker and the read API behind
//! the notification-db breaker.

pub mod composer;
pub mod consumer;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod transport;

pub use composer::{MailComposer, MailMessage};
pub use consumer::UserEventHandler;
pub use error::{NotificationError, NotificationResult};
pub use models::{
    NewNotificationRecord, NotificationListResponse, NotificationRecord, NotificationResponse,
    NotificationStatus, SendResponse,
};
pub use postgres::PgNotificationRepository;
pub use repository::{InMemoryNotificationRepository, NotificationRepository};
pub use service::NotificationService;
pub use transport::{
    MailError, MailTransport, RecordingMailTransport, SmtpConfig, SmtpMailTransport,
};
