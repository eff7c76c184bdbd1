use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EmailNotifications::Table)
                    .if_not_exists()
                    .col(
                        big_integer(EmailNotifications::Id)
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(EmailNotifications::Email))
                    .col(string_len(EmailNotifications::Event, 16))
                    .col(string_len(EmailNotifications::Status, 16))
                    .col(
                        timestamp_with_time_zone(EmailNotifications::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookups by recipient
        manager
            .create_index(
                Index::create()
                    .name("idx_email_notifications_email")
                    .table(EmailNotifications::Table)
                    .col(EmailNotifications::Email)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EmailNotifications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EmailNotifications {
    Table,
    Id,
    Email,
    Event,
    Status,
    CreatedAt,
}
