use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Company {
    Table,
    Id,
    Name,
    Domain,
    Industry,
    Size,
    Revenue,
    Phone,
    Website,
    Address,
    CompanyType,
    Status,
    Description,
    Tags,
    SocialMedia,
    OwnerId,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Contact {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Phone,
    Mobile,
    Title,
    CompanyId,
    Department,
    Address,
    Status,
    Source,
    Tags,
    Notes,
    SocialMedia,
    OwnerId,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Deal {
    Table,
    Id,
    Title,
    Description,
    Value,
    Currency,
    Stage,
    Probability,
    ExpectedCloseDate,
    ActualCloseDate,
    ContactId,
    CompanyId,
    OwnerId,
    Products,
    LostReason,
    WonDetails,
    NextStep,
    Tags,
    Attachments,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Company::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Company::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Company::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Company::Domain).string_len(256))
                    .col(ColumnDef::new(Company::Industry).string_len(128))
                    .col(ColumnDef::new(Company::Size).string_len(16))
                    .col(ColumnDef::new(Company::Revenue).double())
                    .col(ColumnDef::new(Company::Phone).string_len(64))
                    .col(ColumnDef::new(Company::Website).string_len(512))
                    .col(ColumnDef::new(Company::Address).json())
                    .col(
                        ColumnDef::new(Company::CompanyType)
                            .string_len(16)
                            .not_null()
                            .default("prospect"),
                    )
                    .col(
                        ColumnDef::new(Company::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Company::Description).text())
                    .col(ColumnDef::new(Company::Tags).json().not_null())
                    .col(ColumnDef::new(Company::SocialMedia).json())
                    .col(ColumnDef::new(Company::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Company::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Company::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Company::UpdatedAt)
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
                    .name("idx_company_name")
                    .table(Company::Table)
                    .col(Company::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_company_created_at")
                    .table(Company::Table)
                    .col(Company::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Contact::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Contact::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Contact::FirstName).string_len(128).not_null())
                    .col(ColumnDef::new(Contact::LastName).string_len(128).not_null())
                    .col(ColumnDef::new(Contact::Email).string_len(320).not_null())
                    .col(ColumnDef::new(Contact::Phone).string_len(64))
                    .col(ColumnDef::new(Contact::Mobile).string_len(64))
                    .col(ColumnDef::new(Contact::Title).string_len(128))
                    .col(ColumnDef::new(Contact::CompanyId).uuid())
                    .col(ColumnDef::new(Contact::Department).string_len(128))
                    .col(ColumnDef::new(Contact::Address).json())
                    .col(
                        ColumnDef::new(Contact::Status)
                            .string_len(16)
                            .not_null()
                            .default("lead"),
                    )
                    .col(
                        ColumnDef::new(Contact::Source)
                            .string_len(16)
                            .not_null()
                            .default("other"),
                    )
                    .col(ColumnDef::new(Contact::Tags).json().not_null())
                    .col(ColumnDef::new(Contact::Notes).text())
                    .col(ColumnDef::new(Contact::SocialMedia).json())
                    .col(ColumnDef::new(Contact::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Contact::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Contact::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contact::UpdatedAt)
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
                    .name("idx_contact_email")
                    .table(Contact::Table)
                    .col(Contact::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_contact_company")
                    .table(Contact::Table)
                    .col(Contact::CompanyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_contact_owner")
                    .table(Contact::Table)
                    .col(Contact::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Deal::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Deal::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Deal::Title).string_len(300).not_null())
                    .col(ColumnDef::new(Deal::Description).text())
                    .col(ColumnDef::new(Deal::Value).double().not_null())
                    .col(
                        ColumnDef::new(Deal::Currency)
                            .string_len(3)
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Deal::Stage)
                            .string_len(32)
                            .not_null()
                            .default("qualification"),
                    )
                    .col(
                        ColumnDef::new(Deal::Probability)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(
                        ColumnDef::new(Deal::ExpectedCloseDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Deal::ActualCloseDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Deal::ContactId).uuid().not_null())
                    .col(ColumnDef::new(Deal::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Deal::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Deal::Products).json().not_null())
                    .col(ColumnDef::new(Deal::LostReason).text())
                    .col(ColumnDef::new(Deal::WonDetails).text())
                    .col(ColumnDef::new(Deal::NextStep).text())
                    .col(ColumnDef::new(Deal::Tags).json().not_null())
                    .col(ColumnDef::new(Deal::Attachments).json().not_null())
                    .col(ColumnDef::new(Deal::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Deal::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Deal::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_deal_stage", Deal::Stage),
            ("idx_deal_owner", Deal::OwnerId),
            ("idx_deal_company", Deal::CompanyId),
            ("idx_deal_contact", Deal::ContactId),
            ("idx_deal_created_at", Deal::CreatedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Deal::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Deal::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contact::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Company::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
