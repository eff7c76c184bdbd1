use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder};

use crate::{
    entity,
    error::{NotificationError, NotificationResult},
    models::{NewNotificationRecord, NotificationRecord},
    repository::NotificationRepository,
};

/// PostgreSQL implementation of NotificationRepository using SeaORM
#[derive(Clone)]
pub struct PgNotificationRepository {
    db: DatabaseConnection,
}

impl PgNotificationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_error(e: DbErr) -> NotificationError {
    NotificationError::DatabaseOperation(format!("Database error: {}", e))
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, record: NewNotificationRecord) -> NotificationResult<NotificationRecord> {
        let active_model: entity::ActiveModel = record.into();

        let model = active_model.insert(&self.db).await.map_err(db_error)?;

        tracing::info!(
            notification_id = model.id,
            email = %model.email,
            status = %model.status,
            "Recorded notification"
        );
        model.try_into()
    }

    async fn list(&self) -> NotificationResult<Vec<NotificationRecord>> {
        entity::Entity::find()
            .order_by_asc(entity::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(NotificationRecord::try_from)
            .collect()
    }

    async fn get_by_id(&self, id: i64) -> NotificationResult<Option<NotificationRecord>> {
        entity::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(NotificationRecord::try_from)
            .transpose()
    }

    async fn delete(&self, id: i64) -> NotificationResult<bool> {
        let result = entity::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_error)?;

        if result.rows_affected > 0 {
            tracing::info!(notification_id = id, "Deleted notification");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
