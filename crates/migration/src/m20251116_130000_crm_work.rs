use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Task {
    Table,
    Id,
    Title,
    Description,
    TaskType,
    Priority,
    Status,
    DueDate,
    CompletedAt,
    AssignedTo,
    RelatedType,
    RelatedId,
    Reminder,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Activity {
    Table,
    Id,
    Kind,
    Title,
    Description,
    UserId,
    RelatedType,
    RelatedId,
    Metadata,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Task::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Task::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Task::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Task::Description).text())
                    .col(
                        ColumnDef::new(Task::TaskType)
                            .string_len(16)
                            .not_null()
                            .default("other"),
                    )
                    .col(
                        ColumnDef::new(Task::Priority)
                            .string_len(16)
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(Task::Status)
                            .string_len(16)
                            .not_null()
                            .default("todo"),
                    )
                    .col(
                        ColumnDef::new(Task::DueDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Task::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Task::AssignedTo).uuid().not_null())
                    .col(ColumnDef::new(Task::RelatedType).string_len(16))
                    .col(ColumnDef::new(Task::RelatedId).uuid())
                    .col(ColumnDef::new(Task::Reminder).json())
                    .col(ColumnDef::new(Task::Notes).text())
                    .col(ColumnDef::new(Task::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Task::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Task::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_assignee_status_due")
                    .table(Task::Table)
                    .col(Task::AssignedTo)
                    .col(Task::Status)
                    .col(Task::DueDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_related")
                    .table(Task::Table)
                    .col(Task::RelatedId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Activity::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Activity::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Activity::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(Activity::Title).string_len(512).not_null())
                    .col(ColumnDef::new(Activity::Description).text())
                    .col(ColumnDef::new(Activity::UserId).uuid().not_null())
                    .col(ColumnDef::new(Activity::RelatedType).string_len(16))
                    .col(ColumnDef::new(Activity::RelatedId).uuid())
                    .col(ColumnDef::new(Activity::Metadata).json())
                    .col(
                        ColumnDef::new(Activity::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_created_at")
                    .table(Activity::Table)
                    .col((Activity::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_related")
                    .table(Activity::Table)
                    .col(Activity::RelatedId)
                    .col((Activity::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_user")
                    .table(Activity::Table)
                    .col(Activity::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Activity::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Task::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
