//! Demo data loaded through the same mutation paths the HTTP handlers use.

use chrono::{Duration, Utc};
use entity::company::{CompanyType, Size};
use entity::contact::{Source, Status as ContactStatus};
use entity::deal::Stage;
use entity::shared::ProductLine;
use entity::task::{Priority, Status as TaskStatus, TaskType};
use entity::user::{self, Role};
use entity::TaskTarget;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::auth::CurrentUser;
use crate::companies::{NewCompany, create_company};
use crate::contacts::{NewContact, create_contact};
use crate::deals::{DealPatch, NewDeal, create_deal, update_deal};
use crate::error::ApiResult;
use crate::patch::When;
use crate::tasks::{NewTask, TaskPatch, create_task, update_task};
use crate::users::{Registration, UserPatch, register_user, update_user};

pub const ADMIN_EMAIL: &str = "admin@crm.test";
pub const SALES_EMAIL: &str = "sales@crm.test";
pub const DEMO_PASSWORD: &str = "password123";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub companies: usize,
    pub contacts: usize,
    pub deals: usize,
    pub tasks: usize,
}

fn days_from_now(days: i64) -> When {
    When(Utc::now() + Duration::days(days))
}

async fn with_role(db: &DatabaseConnection, model: user::Model, role: Role) -> ApiResult<user::Model> {
    if model.role == role {
        return Ok(model);
    }
    update_user(
        db,
        model.id,
        UserPatch {
            role: Some(role),
            ..Default::default()
        },
    )
    .await
}

/// Populates an empty database. Returns `None` when the demo admin already exists.
#[tracing::instrument(name = "crm.seed", skip_all)]
pub async fn seed_demo(db: &DatabaseConnection) -> ApiResult<Option<SeedSummary>> {
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(ADMIN_EMAIL))
        .one(db)
        .await?;
    if existing.is_some() {
        tracing::info!("demo data already present");
        return Ok(None);
    }

    let mut summary = SeedSummary::default();
    let admin_model = register_user(
        db,
        Registration {
            name: Some("Ada Admin".into()),
            email: Some(ADMIN_EMAIL.into()),
            password: Some(DEMO_PASSWORD.into()),
            department: Some("Management".into()),
        },
    )
    .await?;
    let sales_model = register_user(
        db,
        Registration {
            name: Some("Sam Seller".into()),
            email: Some(SALES_EMAIL.into()),
            password: Some(DEMO_PASSWORD.into()),
            department: Some("Sales".into()),
        },
    )
    .await?;
    // The admin only wins the first-user promotion on an empty table.
    let admin_model = with_role(db, admin_model, Role::Admin).await?;
    let sales_model = with_role(db, sales_model, Role::Sales).await?;
    summary.users = 2;
    let admin = CurrentUser::from(&admin_model);
    let sales = CurrentUser::from(&sales_model);

    let companies = [
        ("Acme Corp", "acme.example", "Manufacturing", Size::Large, CompanyType::Customer, 12_000_000.0),
        ("Globex", "globex.example", "Technology", Size::Medium, CompanyType::Prospect, 4_500_000.0),
        ("Initech", "initech.example", "Software", Size::Small, CompanyType::Partner, 900_000.0),
    ];
    let mut company_ids = Vec::new();
    for (name, domain, industry, size, company_type, revenue) in companies {
        let model = create_company(
            db,
            NewCompany {
                name: Some(name.into()),
                domain: Some(domain.into()),
                industry: Some(industry.into()),
                size: Some(size),
                revenue: Some(revenue),
                website: Some(format!("https://{domain}")),
                company_type: Some(company_type),
                tags: vec!["demo".into()],
                owner: Some(sales.user_id),
                ..Default::default()
            },
            &admin,
        )
        .await?;
        company_ids.push(model.id);
        summary.companies += 1;
    }

    let contacts = [
        ("Wile", "Coyote", "wile@acme.example", 0, ContactStatus::Customer, Source::Referral),
        ("Hank", "Scorpio", "hank@globex.example", 1, ContactStatus::Prospect, Source::Event),
        ("Peter", "Gibbons", "peter@initech.example", 2, ContactStatus::Lead, Source::Website),
        ("Milton", "Waddams", "milton@initech.example", 2, ContactStatus::Lead, Source::Phone),
    ];
    let mut contact_ids = Vec::new();
    for (first, last, email, company, status, source) in contacts {
        let model = create_contact(
            db,
            NewContact {
                first_name: Some(first.into()),
                last_name: Some(last.into()),
                email: Some(email.into()),
                company: Some(company_ids[company]),
                status: Some(status),
                source: Some(source),
                owner: Some(sales.user_id),
                ..Default::default()
            },
            &sales,
        )
        .await?;
        contact_ids.push((model.id, company_ids[company]));
        summary.contacts += 1;
    }

    let deals = [
        ("Anvil supply contract", 45_000.0, Stage::Negotiation, 0, 20),
        ("Globex platform rollout", 120_000.0, Stage::Proposal, 1, 45),
        ("TPS report tooling", 18_000.0, Stage::Qualification, 2, 60),
        ("Stapler refresh", 2_500.0, Stage::NeedsAnalysis, 3, 30),
        ("Rocket skates", 30_000.0, Stage::Negotiation, 0, 10),
    ];
    let mut deal_ids = Vec::new();
    for (title, value, stage, contact, close_in) in deals {
        let (contact_id, company_id) = contact_ids[contact];
        let model = create_deal(
            db,
            NewDeal {
                title: Some(title.into()),
                value: Some(value),
                stage: Some(stage),
                expected_close_date: Some(days_from_now(close_in)),
                contact: Some(contact_id),
                company: Some(company_id),
                owner: Some(sales.user_id),
                products: vec![ProductLine {
                    name: title.into(),
                    quantity: 1,
                    price: value,
                }],
                ..Default::default()
            },
            &sales,
        )
        .await?;
        deal_ids.push(model.id);
        summary.deals += 1;
    }
    update_deal(
        db,
        deal_ids[4],
        DealPatch {
            stage: Some(Stage::ClosedWon),
            won_details: Some(Some("Signed after the second demo".into())),
            ..Default::default()
        },
        &sales,
    )
    .await?;

    let tasks = [
        ("Call Wile about the anvil order", TaskType::Call, Priority::High, 1, TaskTarget::Deal(deal_ids[0])),
        ("Send Globex proposal", TaskType::Email, Priority::Urgent, 2, TaskTarget::Deal(deal_ids[1])),
        ("Demo for Initech", TaskType::Demo, Priority::Medium, 5, TaskTarget::Company(company_ids[2])),
        ("Follow up with Milton", TaskType::FollowUp, Priority::Low, 7, TaskTarget::Contact(contact_ids[3].0)),
    ];
    let mut task_ids = Vec::new();
    for (title, task_type, priority, due_in, target) in tasks {
        let model = create_task(
            db,
            NewTask {
                title: Some(title.into()),
                task_type: Some(task_type),
                priority: Some(priority),
                due_date: Some(days_from_now(due_in)),
                assigned_to: Some(sales.user_id),
                related_to: Some(target),
                ..Default::default()
            },
            &admin,
        )
        .await?;
        task_ids.push(model.id);
        summary.tasks += 1;
    }
    update_task(
        db,
        task_ids[0],
        TaskPatch {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        },
        &sales,
    )
    .await?;

    tracing::info!(
        users = summary.users,
        companies = summary.companies,
        contacts = summary.contacts,
        deals = summary.deals,
        tasks = summary.tasks,
        "demo data seeded"
    );
    Ok(Some(summary))
}
