//! Plain-text rendering of records, boards and reports.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};

use crate::model::{
    Activity, Analytics, Company, CompanyRef, Contact, ContactRef, DashboardStats, Deal, Link, PageInfo,
    Priority, Stage, StageColumn, Task, TaskStatus, TimelineDay, User, UserRef,
};

/// Board order of the deal stages, left to right.
pub const CANONICAL_STAGES: [Stage; 6] = [
    Stage::Qualification,
    Stage::NeedsAnalysis,
    Stage::Proposal,
    Stage::Negotiation,
    Stage::ClosedWon,
    Stage::ClosedLost,
];

pub const UNKNOWN: &str = "Unknown";

/// Reorders server columns into board order, filling stages without deals.
pub fn board(columns: &[StageColumn]) -> Vec<StageColumn> {
    CANONICAL_STAGES
        .iter()
        .map(|stage| {
            columns
                .iter()
                .find(|column| column.stage == *stage)
                .cloned()
                .unwrap_or_else(|| StageColumn::empty(*stage))
        })
        .collect()
}

pub fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Qualification => "Qualification",
        Stage::NeedsAnalysis => "Needs Analysis",
        Stage::Proposal => "Proposal",
        Stage::Negotiation => "Negotiation",
        Stage::ClosedWon => "Closed Won",
        Stage::ClosedLost => "Closed Lost",
    }
}

pub fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "Low",
        Priority::Medium => "Medium",
        Priority::High => "High",
        Priority::Urgent => "Urgent",
    }
}

pub fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "To Do",
        TaskStatus::InProgress => "In Progress",
        TaskStatus::Completed => "Completed",
        TaskStatus::Cancelled => "Cancelled",
    }
}

/// `snake_case` wire values as title-cased words.
pub fn humanize(raw: &str) -> String {
    raw.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    match code {
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        _ => None,
    }
}

/// `12500.0, "USD"` renders as `$12,500`; cents are shown only when present.
pub fn format_money(value: f64, currency: &str) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_formatted_string(&Locale::en);
    let fraction = cents % 100;
    let amount = if fraction == 0 {
        whole
    } else {
        format!("{whole}.{fraction:02}")
    };
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    match currency_symbol(currency) {
        Some(symbol) => format!("{sign}{symbol}{amount}"),
        None => format!("{sign}{amount} {currency}"),
    }
}

pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

pub fn company_name(link: Option<&Link<CompanyRef>>) -> String {
    match link.and_then(Link::resolved) {
        Some(company) => company.name.clone(),
        None => UNKNOWN.to_string(),
    }
}

pub fn contact_name(link: Option<&Link<ContactRef>>) -> String {
    match link.and_then(Link::resolved) {
        Some(contact) => format!("{} {}", contact.first_name, contact.last_name),
        None => UNKNOWN.to_string(),
    }
}

pub fn user_name(link: Option<&Link<UserRef>>) -> String {
    match link.and_then(Link::resolved) {
        Some(user) => user.name.clone(),
        None => UNKNOWN.to_string(),
    }
}

fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}

/// Left-aligned text table sized to its widest cells.
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) -> &mut Self {
        self.rows.push(cells);
        self
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let width = cell.chars().count();
                match widths.get_mut(i) {
                    Some(slot) => *slot = (*slot).max(width),
                    None => widths.push(width),
                }
            }
        }
        let mut out = String::new();
        push_line(&mut out, &self.headers, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_line(&mut out, &rule, &widths);
        for row in &self.rows {
            push_line(&mut out, row, &widths);
        }
        out
    }
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

pub fn page_footer(page: &PageInfo) -> String {
    format!(
        "Page {} of {} ({} total)",
        page.current_page,
        page.total_pages.max(1),
        page.total
    )
}

pub fn contacts_table(contacts: &[Contact]) -> String {
    let mut table = Table::new(["ID", "Name", "Email", "Company", "Status"]);
    for contact in contacts {
        table.row(vec![
            contact.id.to_string(),
            format!("{} {}", contact.first_name, contact.last_name),
            contact.email.clone(),
            contact
                .company
                .as_ref()
                .map(|link| company_name(Some(link)))
                .unwrap_or_else(|| "-".to_string()),
            humanize(&contact.status),
        ]);
    }
    table.render()
}

pub fn companies_table(companies: &[Company]) -> String {
    let mut table = Table::new(["ID", "Name", "Industry", "Type", "Status"]);
    for company in companies {
        table.row(vec![
            company.id.to_string(),
            company.name.clone(),
            or_dash(company.industry.as_deref()),
            humanize(&company.company_type),
            humanize(&company.status),
        ]);
    }
    table.render()
}

pub fn deals_table(deals: &[Deal]) -> String {
    let mut table = Table::new(["ID", "Title", "Value", "Stage", "Company", "Close"]);
    for deal in deals {
        table.row(vec![
            deal.id.to_string(),
            deal.title.clone(),
            format_money(deal.value, &deal.currency),
            stage_label(deal.stage).to_string(),
            company_name(deal.company.as_ref()),
            format_date(&deal.expected_close_date),
        ]);
    }
    table.render()
}

pub fn tasks_table(tasks: &[Task]) -> String {
    let mut table = Table::new(["ID", "Title", "Due", "Priority", "Status", "Assignee"]);
    for task in tasks {
        table.row(vec![
            task.id.to_string(),
            task.title.clone(),
            format_date(&task.due_date),
            priority_label(task.priority).to_string(),
            status_label(task.status).to_string(),
            user_name(task.assigned_to.as_ref()),
        ]);
    }
    table.render()
}

pub fn users_table(users: &[User]) -> String {
    let mut table = Table::new(["ID", "Name", "Email", "Role", "Active"]);
    for user in users {
        table.row(vec![
            user.id.to_string(),
            user.name.clone(),
            user.email.clone(),
            humanize(&user.role),
            if user.is_active { "yes" } else { "no" }.to_string(),
        ]);
    }
    table.render()
}

fn field(out: &mut String, label: &str, value: impl AsRef<str>) {
    let _ = writeln!(out, "{label:<14}{}", value.as_ref());
}

pub fn contact_detail(contact: &Contact) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", contact.first_name, contact.last_name);
    field(&mut out, "Email", &contact.email);
    field(&mut out, "Phone", or_dash(contact.phone.as_deref()));
    field(&mut out, "Title", or_dash(contact.title.as_deref()));
    field(&mut out, "Company", company_name(contact.company.as_ref()));
    field(&mut out, "Status", humanize(&contact.status));
    field(&mut out, "Source", humanize(&contact.source));
    field(&mut out, "Owner", user_name(contact.owner.as_ref()));
    if !contact.tags.is_empty() {
        field(&mut out, "Tags", contact.tags.join(", "));
    }
    if let Some(notes) = contact.notes.as_deref() {
        field(&mut out, "Notes", notes);
    }
    out
}

pub fn company_detail(company: &Company) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", company.name);
    field(&mut out, "Domain", or_dash(company.domain.as_deref()));
    field(&mut out, "Industry", or_dash(company.industry.as_deref()));
    field(&mut out, "Size", or_dash(company.size.as_deref()));
    field(
        &mut out,
        "Revenue",
        company
            .revenue
            .map(|revenue| format_money(revenue, "USD"))
            .unwrap_or_else(|| "-".to_string()),
    );
    field(&mut out, "Type", humanize(&company.company_type));
    field(&mut out, "Status", humanize(&company.status));
    field(&mut out, "Owner", user_name(company.owner.as_ref()));
    out
}

pub fn deal_detail(deal: &Deal) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", deal.title);
    field(&mut out, "Value", format_money(deal.value, &deal.currency));
    field(&mut out, "Stage", stage_label(deal.stage));
    field(&mut out, "Probability", format!("{}%", deal.probability));
    field(&mut out, "Expected", format_date(&deal.expected_close_date));
    if let Some(closed) = &deal.actual_close_date {
        field(&mut out, "Closed", format_date(closed));
    }
    field(&mut out, "Company", company_name(deal.company.as_ref()));
    field(&mut out, "Contact", contact_name(deal.contact.as_ref()));
    field(&mut out, "Owner", user_name(deal.owner.as_ref()));
    if let Some(step) = deal.next_step.as_deref() {
        field(&mut out, "Next step", step);
    }
    out
}

pub fn task_detail(task: &Task) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", task.title);
    field(&mut out, "Type", humanize(&task.task_type));
    field(&mut out, "Priority", priority_label(task.priority));
    field(&mut out, "Status", status_label(task.status));
    field(&mut out, "Due", format_date(&task.due_date));
    if let Some(done) = &task.completed_at {
        field(&mut out, "Completed", format_date(done));
    }
    field(&mut out, "Assignee", user_name(task.assigned_to.as_ref()));
    if let Some(subject) = &task.related_to {
        field(&mut out, "Related", format!("{} {}", humanize(&subject.kind), subject.id));
    }
    out
}

pub fn activity_line(activity: &Activity) -> String {
    format!(
        "{}  {:<16}{}  ({})",
        activity.created_at.format("%Y-%m-%d %H:%M"),
        humanize(&activity.kind),
        activity.title,
        user_name(activity.user.as_ref())
    )
}

pub fn activities_list(activities: &[Activity]) -> String {
    let mut out = String::new();
    for activity in activities {
        out.push_str(&activity_line(activity));
        out.push('\n');
    }
    out
}

pub fn pipeline_board(columns: &[StageColumn]) -> String {
    let mut out = String::new();
    for column in board(columns) {
        let _ = writeln!(
            out,
            "{} ({}, {})",
            stage_label(column.stage),
            column.count,
            format_money(column.total_value, "USD")
        );
        for deal in &column.deals {
            let company = deal
                .company
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_else(|| UNKNOWN.to_string());
            let _ = writeln!(
                out,
                "  {}  {}  {}  {}%",
                deal.title,
                format_money(deal.value, "USD"),
                company,
                deal.probability
            );
        }
    }
    out
}

pub fn dashboard(stats: &DashboardStats) -> String {
    let overview = &stats.overview;
    let mut out = String::new();
    field(&mut out, "Contacts", overview.total_contacts.to_string());
    field(&mut out, "Companies", overview.total_companies.to_string());
    field(&mut out, "Deals", overview.total_deals.to_string());
    field(&mut out, "Open tasks", overview.pending_tasks.to_string());
    field(&mut out, "Revenue", format_money(overview.total_revenue, "USD"));

    out.push_str("\nDeals by stage\n");
    let mut stages = Table::new(["Stage", "Deals", "Value"]);
    for stage in CANONICAL_STAGES {
        let (count, value) = stats
            .deals_by_stage
            .iter()
            .find(|total| total.stage == stage)
            .map(|total| (total.count, total.total_value))
            .unwrap_or((0, 0.0));
        stages.row(vec![
            stage_label(stage).to_string(),
            count.to_string(),
            format_money(value, "USD"),
        ]);
    }
    out.push_str(&stages.render());

    if !stats.monthly_revenue.is_empty() {
        out.push_str("\nMonthly revenue\n");
        let mut months = Table::new(["Month", "Deals", "Revenue"]);
        for month in &stats.monthly_revenue {
            months.row(vec![
                format!("{}-{:02}", month.year, month.month),
                month.count.to_string(),
                format_money(month.revenue, "USD"),
            ]);
        }
        out.push_str(&months.render());
    }

    out.push_str("\nUpcoming tasks\n");
    if stats.upcoming_tasks.is_empty() {
        out.push_str("  none\n");
    } else {
        for task in &stats.upcoming_tasks {
            let _ = writeln!(
                out,
                "  {}  {}  {}",
                format_date(&task.due_date),
                priority_label(task.priority),
                task.title
            );
        }
    }

    out.push_str("\nRecent activity\n");
    for activity in &stats.recent_activities {
        let _ = writeln!(out, "  {}", activity_line(activity));
    }
    out
}

pub fn analytics(report: &Analytics) -> String {
    let metrics = &report.metrics;
    let mut out = String::new();
    let _ = writeln!(out, "Period: {}", report.period);
    field(&mut out, "New contacts", metrics.new_contacts.to_string());
    field(&mut out, "New companies", metrics.new_companies.to_string());
    field(&mut out, "New deals", metrics.new_deals.to_string());
    field(&mut out, "Closed won", metrics.closed_deals.to_string());
    field(&mut out, "Revenue", format_money(metrics.revenue, "USD"));
    field(&mut out, "Conversion", format!("{:.1}%", metrics.conversion_rate));
    field(&mut out, "Avg deal", format_money(metrics.avg_deal_size, "USD"));

    if !report.task_completion.is_empty() {
        out.push_str("\nTasks by status\n");
        for entry in &report.task_completion {
            let _ = writeln!(out, "  {:<14}{}", status_label(entry.status), entry.count);
        }
    }

    out.push_str("\nTop performers\n");
    let mut table = Table::new(["User", "Deals", "Revenue"]);
    for performer in &report.top_performers {
        table.row(vec![
            performer
                .user
                .as_ref()
                .map(|user| user.name.clone())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            performer.deals.to_string(),
            format_money(performer.revenue, "USD"),
        ]);
    }
    out.push_str(&table.render());
    out
}

pub fn timeline(days: &[TimelineDay]) -> String {
    let mut out = String::new();
    for day in days {
        let _ = writeln!(out, "{}", day.date.format("%A, %B %-d %Y"));
        for activity in &day.activities {
            let _ = writeln!(
                out,
                "  {}  {}  ({})",
                activity.created_at.format("%H:%M"),
                activity.title,
                user_name(activity.user.as_ref())
            );
        }
    }
    out
}
