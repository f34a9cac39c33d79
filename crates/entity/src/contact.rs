use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "contact")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub title: Option<String>,
    #[sea_orm(indexed)]
    #[serde(rename = "company")]
    pub company_id: Option<Uuid>,
    pub department: Option<String>,
    pub address: Option<Json>,
    pub status: Status,
    pub source: Source,
    pub tags: Json,
    pub notes: Option<String>,
    pub social_media: Option<Json>,
    #[sea_orm(indexed)]
    #[serde(rename = "owner")]
    pub owner_id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[derive(Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    #[sea_orm(string_value = "lead")]
    Lead,
    #[sea_orm(string_value = "prospect")]
    Prospect,
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

#[derive(Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum Source {
    #[sea_orm(string_value = "website")]
    Website,
    #[sea_orm(string_value = "referral")]
    Referral,
    #[sea_orm(string_value = "social")]
    Social,
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "phone")]
    Phone,
    #[sea_orm(string_value = "event")]
    Event,
    #[default]
    #[sea_orm(string_value = "other")]
    Other,
}

impl ActiveModelBehavior for ActiveModel {}
