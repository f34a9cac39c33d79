use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "company")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub size: Option<Size>,
    #[sea_orm(column_type = "Double", nullable)]
    pub revenue: Option<f64>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<Json>,
    #[serde(rename = "type")]
    pub company_type: CompanyType,
    pub status: Status,
    pub description: Option<String>,
    pub tags: Json,
    pub social_media: Option<Json>,
    #[sea_orm(indexed)]
    #[serde(rename = "owner")]
    pub owner_id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// Headcount buckets.
#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum Size {
    #[sea_orm(string_value = "1-10")]
    #[serde(rename = "1-10")]
    Micro,
    #[sea_orm(string_value = "11-50")]
    #[serde(rename = "11-50")]
    Small,
    #[sea_orm(string_value = "51-200")]
    #[serde(rename = "51-200")]
    Medium,
    #[sea_orm(string_value = "201-500")]
    #[serde(rename = "201-500")]
    Large,
    #[sea_orm(string_value = "501-1000")]
    #[serde(rename = "501-1000")]
    VeryLarge,
    #[sea_orm(string_value = "1001-5000")]
    #[serde(rename = "1001-5000")]
    Enterprise,
    #[sea_orm(string_value = "5000+")]
    #[serde(rename = "5000+")]
    Global,
}

#[derive(Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum CompanyType {
    #[default]
    #[sea_orm(string_value = "prospect")]
    Prospect,
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "partner")]
    Partner,
    #[sea_orm(string_value = "vendor")]
    Vendor,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "pending")]
    Pending,
}

impl ActiveModelBehavior for ActiveModel {}
