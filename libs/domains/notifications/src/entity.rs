use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use std::str::FromStr;

use crate::error::NotificationError;
use crate::models::{NewNotificationRecord, NotificationRecord, NotificationStatus};
use notification_common::EventType;

/// Sea-ORM entity for the `email_notifications` table
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "email_notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub email: String,
    pub event: String,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for NotificationRecord {
    type Error = NotificationError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let event_type = EventType::from_str(&model.event).map_err(|_| {
            NotificationError::DatabaseOperation(format!(
                "Unknown event '{}' in notification {}",
                model.event, model.id
            ))
        })?;
        let status = NotificationStatus::from_str(&model.status).map_err(|_| {
            NotificationError::DatabaseOperation(format!(
                "Unknown status '{}' in notification {}",
                model.status, model.id
            ))
        })?;

        Ok(Self {
            id: model.id,
            email: model.email,
            event_type,
            status,
            timestamp: model.created_at.into(),
        })
    }
}

impl From<NewNotificationRecord> for ActiveModel {
    fn from(record: NewNotificationRecord) -> Self {
        ActiveModel {
            id: NotSet,
            email: Set(record.email),
            event: Set(record.event_type.to_string()),
            status: Set(record.status.to_string()),
            created_at: Set(record.timestamp.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn model(event: &str, status: &str) -> Model {
        Model {
            id: 3,
            email: "a@b.com".into(),
            event: event.into(),
            status: status.into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap().into(),
        }
    }

    #[test]
    fn test_model_to_record() {
        let record = NotificationRecord::try_from(model("DELETED", "FAILED")).unwrap();
        assert_eq!(record.event_type, EventType::Deleted);
        assert_eq!(record.status, NotificationStatus::Failed);
    }

    #[test]
    fn test_unknown_status_is_database_error() {
        let err = NotificationRecord::try_from(model("CREATED", "QUEUED")).unwrap_err();
        assert!(matches!(err, NotificationError::DatabaseOperation(ref msg) if msg.contains("QUEUED")));
    }

    #[test]
    fn test_new_record_stores_text_columns() {
        let active: ActiveModel = NewNotificationRecord {
            email: "a@b.com".into(),
            event_type: EventType::Created,
            status: NotificationStatus::Sent,
            timestamp: Utc::now(),
        }
        .into();

        assert_eq!(active.event, Set("CREATED".to_string()));
        assert_eq!(active.status, Set("SENT".to_string()));
        assert_eq!(active.id, NotSet);
    }
}
