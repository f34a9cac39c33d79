use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deal")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub value: f64,
    pub currency: String,
    #[sea_orm(indexed)]
    pub stage: Stage,
    pub probability: i32,
    pub expected_close_date: DateTimeWithTimeZone,
    pub actual_close_date: Option<DateTimeWithTimeZone>,
    #[sea_orm(indexed)]
    #[serde(rename = "contact")]
    pub contact_id: Uuid,
    #[sea_orm(indexed)]
    #[serde(rename = "company")]
    pub company_id: Uuid,
    #[sea_orm(indexed)]
    #[serde(rename = "owner")]
    pub owner_id: Uuid,
    pub products: Json,
    pub lost_reason: Option<String>,
    pub won_details: Option<String>,
    pub next_step: Option<String>,
    pub tags: Json,
    pub attachments: Json,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[derive(
    Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    #[sea_orm(string_value = "qualification")]
    Qualification,
    #[sea_orm(string_value = "needs_analysis")]
    NeedsAnalysis,
    #[sea_orm(string_value = "proposal")]
    Proposal,
    #[sea_orm(string_value = "negotiation")]
    Negotiation,
    #[sea_orm(string_value = "closed_won")]
    ClosedWon,
    #[sea_orm(string_value = "closed_lost")]
    ClosedLost,
}

impl Stage {
    /// Win probability implied by the stage, in percent.
    pub const fn probability(self) -> i32 {
        match self {
            Stage::Qualification => 10,
            Stage::NeedsAnalysis => 25,
            Stage::Proposal => 50,
            Stage::Negotiation => 75,
            Stage::ClosedWon => 100,
            Stage::ClosedLost => 0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Qualification => "qualification",
            Stage::NeedsAnalysis => "needs_analysis",
            Stage::Proposal => "proposal",
            Stage::Negotiation => "negotiation",
            Stage::ClosedWon => "closed_won",
            Stage::ClosedLost => "closed_lost",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ActiveModelBehavior for ActiveModel {}
