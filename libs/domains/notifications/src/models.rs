use axum_helpers::Links;
use chrono::{DateTime, Utc};
use notification_common::EventType;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Outcome of a mail send attempt
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

/// Audit row for one processed user event. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: i64,
    pub email: String,
    pub event_type: EventType,
    pub status: NotificationStatus,
    /// Time of the send attempt
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotificationRecord {
    pub email: String,
    pub event_type: EventType,
    pub status: NotificationStatus,
    pub timestamp: DateTime<Utc>,
}

impl NewNotificationRecord {
    pub fn into_record(self, id: i64) -> NotificationRecord {
        NotificationRecord {
            id,
            email: self.email,
            event_type: self.event_type,
            status: self.status,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    #[serde(flatten)]
    pub record: NotificationRecord,
    #[serde(rename = "_links")]
    pub links: Links,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationResponse>,
    #[serde(rename = "_links")]
    pub links: Links,
}

/// Echo of an accepted send request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub email: String,
    pub event_type: EventType,
    #[serde(rename = "_links")]
    pub links: Links,
}
