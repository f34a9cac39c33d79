//! Single-pass aggregations behind the dashboard, analytics and pipeline.
//!
//! Loaders fetch the relevant rows; everything here is pure so the grouping
//! rules can be checked without a database.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use entity::{deal, task};
use sea_orm::entity::prelude::Uuid;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Trailing window selected on the analytics endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "7days")]
    Week,
    #[default]
    #[serde(rename = "30days")]
    Month,
    #[serde(rename = "90days")]
    Quarter,
    #[serde(rename = "1year")]
    Year,
}

impl Period {
    /// Day windows are fixed lengths; the year steps back one calendar year.
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Period::Week => now - Duration::days(7),
            Period::Month => now - Duration::days(30),
            Period::Quarter => now - Duration::days(90),
            Period::Year => now
                .checked_sub_months(Months::new(12))
                .unwrap_or(now - Duration::days(365)),
        }
    }
}

impl FromStr for Period {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "7days" => Ok(Period::Week),
            "30days" => Ok(Period::Month),
            "90days" => Ok(Period::Quarter),
            "1year" => Ok(Period::Year),
            other => Err(ApiError::validation(format!(
                "Unknown period '{other}', expected one of 7days, 30days, 90days, 1year"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTotal {
    pub stage: deal::Stage,
    pub count: u64,
    pub total_value: f64,
}

/// Deals of one stage on the pipeline board.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageColumn<T> {
    pub stage: deal::Stage,
    pub deals: Vec<T>,
    pub count: u64,
    pub total_value: f64,
}

/// Buckets every deal by stage, keeping input order inside each bucket.
pub fn pipeline_columns<T>(
    deals: &[deal::Model],
    mut card: impl FnMut(&deal::Model) -> T,
) -> Vec<StageColumn<T>> {
    let mut columns: Vec<StageColumn<T>> = Vec::new();
    for deal in deals {
        let position = match columns.iter().position(|c| c.stage == deal.stage) {
            Some(position) => position,
            None => {
                columns.push(StageColumn {
                    stage: deal.stage,
                    deals: Vec::new(),
                    count: 0,
                    total_value: 0.0,
                });
                columns.len() - 1
            }
        };
        let column = &mut columns[position];
        column.deals.push(card(deal));
        column.count += 1;
        column.total_value += deal.value;
    }
    columns.sort_by_key(|c| c.stage.as_str());
    columns
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    pub revenue: f64,
    pub count: u64,
}

/// Won revenue per calendar month of close, over the trailing twelve months.
pub fn monthly_revenue<'a>(
    deals: impl IntoIterator<Item = &'a deal::Model>,
    now: DateTime<Utc>,
) -> Vec<MonthlyRevenue> {
    let start = now
        .checked_sub_months(Months::new(12))
        .unwrap_or(now);
    let mut months: Vec<MonthlyRevenue> = Vec::new();
    for deal in deals {
        if deal.stage != deal::Stage::ClosedWon {
            continue;
        }
        let Some(closed) = deal.actual_close_date.map(|d| d.with_timezone(&Utc)) else {
            continue;
        };
        if closed < start {
            continue;
        }
        let (year, month) = (closed.year(), closed.month());
        match months.iter_mut().find(|m| m.year == year && m.month == month) {
            Some(bucket) => {
                bucket.revenue += deal.value;
                bucket.count += 1;
            }
            None => months.push(MonthlyRevenue {
                year,
                month,
                revenue: deal.value,
                count: 1,
            }),
        }
    }
    months.sort_by_key(|m| (m.year, m.month));
    months
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRevenue {
    pub owner_id: Uuid,
    pub revenue: f64,
    pub deals: u64,
}

pub const TOP_PERFORMERS: usize = 5;

/// Owners ranked by summed deal value, skipping owners `known` rejects.
/// Ties keep first-seen order.
pub fn top_performers<'a>(
    deals: impl IntoIterator<Item = &'a deal::Model>,
    known: impl Fn(Uuid) -> bool,
) -> Vec<OwnerRevenue> {
    let mut owners: Vec<OwnerRevenue> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    for deal in deals {
        let slot = *index.entry(deal.owner_id).or_insert_with(|| {
            owners.push(OwnerRevenue {
                owner_id: deal.owner_id,
                revenue: 0.0,
                deals: 0,
            });
            owners.len() - 1
        });
        owners[slot].revenue += deal.value;
        owners[slot].deals += 1;
    }
    owners.retain(|owner| known(owner.owner_id));
    owners.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    owners.truncate(TOP_PERFORMERS);
    owners
}

/// Closed over new deals as a percentage with two decimals; 0 when nothing is new.
pub fn conversion_rate(closed: u64, new: u64) -> f64 {
    if new == 0 {
        return 0.0;
    }
    round2(closed as f64 / new as f64 * 100.0)
}

pub fn average(total: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: task::Status,
    pub count: u64,
}

/// Task counts per status, only for statuses that occur.
pub fn status_histogram<'a>(tasks: impl IntoIterator<Item = &'a task::Model>) -> Vec<StatusCount> {
    let mut counts: HashMap<task::Status, u64> = HashMap::new();
    for task in tasks {
        *counts.entry(task.status).or_default() += 1;
    }
    task::Status::iter()
        .filter_map(|status| {
            counts
                .get(&status)
                .map(|&count| StatusCount { status, count })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn deal(stage: deal::Stage, value: f64, owner: Uuid, closed: Option<DateTime<Utc>>) -> deal::Model {
        let now = Utc::now().into();
        deal::Model {
            id: Uuid::new_v4(),
            title: format!("{stage} deal"),
            description: None,
            value,
            currency: "USD".into(),
            stage,
            probability: stage.probability(),
            expected_close_date: now,
            actual_close_date: closed.map(Into::into),
            contact_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            owner_id: owner,
            products: json!([]),
            lost_reason: None,
            won_details: None,
            next_step: None,
            tags: json!([]),
            attachments: json!([]),
            created_by: owner,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn pipeline_sums_per_stage() {
        let owner = Uuid::new_v4();
        let deals = vec![
            deal(deal::Stage::Proposal, 40_000.0, owner, None),
            deal(deal::Stage::Qualification, 20_000.0, owner, None),
            deal(deal::Stage::Proposal, 50_000.0, owner, None),
            deal(deal::Stage::Qualification, 30_000.0, owner, None),
            deal(deal::Stage::Proposal, 60_000.0, owner, None),
            deal(deal::Stage::ClosedLost, 5_000.0, owner, None),
        ];
        let columns = pipeline_columns(&deals, |d| d.id);

        let stages: Vec<_> = columns.iter().map(|c| c.stage).collect();
        assert_eq!(
            stages,
            vec![deal::Stage::ClosedLost, deal::Stage::Proposal, deal::Stage::Qualification]
        );
        let proposal = &columns[1];
        assert_eq!(proposal.count, 3);
        assert_eq!(proposal.deals.len(), 3);
        assert_eq!(proposal.total_value, 150_000.0);
        assert_eq!(proposal.deals[0], deals[0].id);
        let qualification = &columns[2];
        assert_eq!(qualification.count, 2);
        assert_eq!(qualification.total_value, 50_000.0);
    }

    #[test]
    fn monthly_revenue_uses_won_close_month() {
        let owner = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let deals = vec![
            deal(deal::Stage::ClosedWon, 100.0, owner, Some(Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 0).unwrap())),
            deal(deal::Stage::ClosedWon, 50.0, owner, Some(Utc.with_ymd_and_hms(2025, 5, 30, 0, 0, 0).unwrap())),
            deal(deal::Stage::ClosedWon, 70.0, owner, Some(Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap())),
            // outside the trailing year
            deal(deal::Stage::ClosedWon, 999.0, owner, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())),
            // stamped but no longer won
            deal(deal::Stage::Negotiation, 500.0, owner, Some(Utc.with_ymd_and_hms(2025, 5, 3, 0, 0, 0).unwrap())),
            deal(deal::Stage::ClosedWon, 10.0, owner, None),
        ];
        let months = monthly_revenue(&deals, now);
        assert_eq!(
            months,
            vec![
                MonthlyRevenue { year: 2024, month: 11, revenue: 70.0, count: 1 },
                MonthlyRevenue { year: 2025, month: 5, revenue: 150.0, count: 2 },
            ]
        );
    }

    #[test]
    fn top_performers_rank_by_revenue_and_cap_at_five() {
        let owners: Vec<Uuid> = (0..7).map(|_| Uuid::new_v4()).collect();
        let mut deals = Vec::new();
        for (rank, owner) in owners.iter().enumerate() {
            deals.push(deal(deal::Stage::ClosedWon, 1_000.0 * (rank as f64 + 1.0), *owner, None));
        }
        deals.push(deal(deal::Stage::ClosedWon, 500.0, owners[0], None));

        let ranked = top_performers(&deals, |_| true);
        assert_eq!(ranked.len(), TOP_PERFORMERS);
        assert_eq!(ranked[0].owner_id, owners[6]);
        assert_eq!(ranked[0].revenue, 7_000.0);
        assert!(ranked.windows(2).all(|w| w[0].revenue >= w[1].revenue));
        assert!(!ranked.iter().any(|r| r.owner_id == owners[0]));
    }

    #[test]
    fn tied_performers_keep_grouping_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let deals = vec![
            deal(deal::Stage::ClosedWon, 100.0, a, None),
            deal(deal::Stage::ClosedWon, 100.0, b, None),
        ];
        let ranked = top_performers(&deals, |_| true);
        assert_eq!(ranked[0].owner_id, a);
        assert_eq!(ranked[1].owner_id, b);
    }

    #[test]
    fn unknown_owners_do_not_take_a_slot() {
        let owners: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        let gone = owners[5];
        let deals: Vec<deal::Model> = owners
            .iter()
            .enumerate()
            .map(|(rank, owner)| deal(deal::Stage::ClosedWon, 100.0 * (rank as f64 + 1.0), *owner, None))
            .collect();

        let ranked = top_performers(&deals, |owner| owner != gone);
        assert_eq!(ranked.len(), TOP_PERFORMERS);
        assert!(ranked.iter().all(|r| r.owner_id != gone));
        assert_eq!(ranked[4].owner_id, owners[0]);
    }

    #[test]
    fn conversion_rate_rounds_and_handles_zero() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(3, 0), 0.0);
        assert_eq!(conversion_rate(1, 3), 33.33);
        assert_eq!(conversion_rate(2, 4), 50.0);
        assert_eq!(average(300.0, 3), 100.0);
        assert_eq!(average(0.0, 0), 0.0);
    }

    #[test]
    fn period_parses_known_windows_only() {
        assert_eq!("7days".parse::<Period>().unwrap(), Period::Week);
        assert_eq!("1year".parse::<Period>().unwrap(), Period::Year);
        assert!("2weeks".parse::<Period>().is_err());
        assert_eq!(Period::default(), Period::Month);
    }

    #[test]
    fn period_year_is_a_calendar_year() {
        let leap = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(Period::Year.start(leap), Utc.with_ymd_and_hms(2023, 3, 1, 9, 30, 0).unwrap());
        let feb29 = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        assert_eq!(Period::Year.start(feb29), Utc.with_ymd_and_hms(2023, 2, 28, 0, 0, 0).unwrap());
        assert_eq!(Period::Week.start(leap), leap - Duration::days(7));
    }
}
