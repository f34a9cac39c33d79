use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum AppUser { Table, Id, Name, Email, Role, Department, Avatar, IsActive, LastLogin, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum UserSecret { Table, UserId, PasswordHash, UpdatedAt }

#[derive(DeriveMigrationName)]
pub struct Migration;
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(AppUser::Table)
                .if_not_exists()
                .col(ColumnDef::new(AppUser::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(AppUser::Name).string_len(128).not_null())
                .col(ColumnDef::new(AppUser::Email).string_len(320).not_null())
                .col(ColumnDef::new(AppUser::Role).string_len(16).not_null().default("user"))
                .col(ColumnDef::new(AppUser::Department).string_len(128))
                .col(ColumnDef::new(AppUser::Avatar).string_len(512))
                .col(ColumnDef::new(AppUser::IsActive).boolean().not_null().default(true))
                .col(ColumnDef::new(AppUser::LastLogin).timestamp_with_time_zone())
                .col(ColumnDef::new(AppUser::CreatedAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(AppUser::UpdatedAt).timestamp_with_time_zone().not_null())
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().if_not_exists().name("idx_app_user_email").table(AppUser::Table).col(AppUser::Email).unique().to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(UserSecret::Table)
                .if_not_exists()
                .col(ColumnDef::new(UserSecret::UserId).uuid().not_null().primary_key())
                .col(ColumnDef::new(UserSecret::PasswordHash).string_len(256).not_null())
                .col(ColumnDef::new(UserSecret::UpdatedAt).timestamp_with_time_zone().not_null())
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(UserSecret::Table).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(AppUser::Table).if_exists().to_owned()).await?;
        Ok(())
    }
}
