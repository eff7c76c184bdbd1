//! Wire contract for user lifecycle events.
//!
//! The user service publishes a [`NotificationEvent`] to the `user-event` topic
//! after creating a user and before deleting one; the notification service
//! consumes it and sends the matching email.
//!
//! ```json
//! {"email": "a@b.com", "eventType": "CREATED"}
//! ```

pub mod event;
pub mod publisher;

pub use event::{DecodeError, EventType, NotificationEvent, decode, encode};
pub use publisher::{
    CONTENT_TYPE_HEADER, EventPublisher, InMemoryEventPublisher, JSON_CONTENT_TYPE,
    KafkaEventPublisher, PublishError,
};
