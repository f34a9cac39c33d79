use std::net::SocketAddr;

use api::auth::AuthConfig;
use api::AppState;
use chrono::{Duration, Utc};
use client::api::ClientError;
use client::model::{Company, Contact, Deal, ListQuery, NewCompany, NewContact, NewDeal, Stage};
use client::views;
use client::{CrmClient, CrmSession};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use serde_json::json;
use tokio::net::TcpListener;

async fn spawn_server() -> SocketAddr {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let app = api::router(AppState::new(db, AuthConfig::new("e2e-secret")));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn base_url(addr: SocketAddr) -> String {
    format!("http://{addr}/api")
}

async fn signed_in(addr: SocketAddr) -> CrmSession {
    let mut session = CrmSession::new(CrmClient::new(base_url(addr)));
    let user = session
        .register("Ada Admin", "ada@example.com", "secret123")
        .await
        .unwrap();
    assert_eq!(user.role, "admin");
    session
}

async fn seed_company_and_contact(session: &mut CrmSession) -> (Company, Contact) {
    let company = session
        .create::<Company>(&NewCompany {
            name: "Acme Corp".to_string(),
            industry: Some("Manufacturing".to_string()),
            ..NewCompany::default()
        })
        .await
        .unwrap();
    let contact = session
        .create::<Contact>(&NewContact {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@acme.test".to_string(),
            company: Some(company.id),
            ..NewContact::default()
        })
        .await
        .unwrap();
    (company, contact)
}

fn new_deal(title: &str, value: f64, stage: Stage, company: &Company, contact: &Contact) -> NewDeal {
    NewDeal {
        title: title.to_string(),
        value,
        currency: None,
        stage: Some(stage),
        expected_close_date: Utc::now() + Duration::days(30),
        contact: contact.id,
        company: company.id,
        next_step: None,
    }
}

#[tokio::test]
async fn create_list_and_delete_through_the_session() {
    let addr = spawn_server().await;
    let mut session = signed_in(addr).await;
    let (company, contact) = seed_company_and_contact(&mut session).await;

    assert_eq!(session.store().companies.items.len(), 1);
    assert_eq!(session.store().contacts.items.len(), 1);
    assert_eq!(
        views::company_name(session.store().contacts.items[0].company.as_ref()),
        "Acme Corp"
    );

    let deal = session
        .create::<Deal>(&new_deal("Fleet renewal", 25_000.0, Stage::Proposal, &company, &contact))
        .await
        .unwrap();
    assert_eq!(deal.probability, 50);
    assert_eq!(deal.currency, "USD");

    session.fetch::<Deal>(ListQuery::default()).await.unwrap();
    let stats = &session.store().deals.stage_stats;
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].stage, Stage::Proposal);
    assert_eq!(stats[0].total_value, 25_000.0);

    session.pipeline().await.unwrap();
    let board = views::board(&session.store().deals.pipeline);
    assert_eq!(board.len(), 6);
    assert_eq!(board[2].stage, Stage::Proposal);
    assert_eq!(board[2].count, 1);
    assert!(board[0].deals.is_empty());

    let opened = session.open::<Contact>(contact.id).await.unwrap();
    assert_eq!(views::company_name(opened.company.as_ref()), "Acme Corp");

    let declined = session.delete::<Deal>(deal.id, || false).await.unwrap();
    assert!(!declined);
    assert!(session.client().get::<Deal>(deal.id).await.is_ok());

    let deleted = session.delete::<Deal>(deal.id, || true).await.unwrap();
    assert!(deleted);
    assert!(session.store().deals.records.items.is_empty());
    match session.client().get::<Deal>(deal.id).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Deal not found");
        }
        other => panic!("expected 404, got {other:?}"),
    }
}

#[tokio::test]
async fn updates_refresh_the_cached_list() {
    let addr = spawn_server().await;
    let mut session = signed_in(addr).await;
    let (company, contact) = seed_company_and_contact(&mut session).await;
    let deal = session
        .create::<Deal>(&new_deal("Pilot", 4_000.0, Stage::Qualification, &company, &contact))
        .await
        .unwrap();
    session.open::<Deal>(deal.id).await.unwrap();

    let updated = session
        .update::<Deal>(deal.id, &json!({ "stage": "closed_won" }))
        .await
        .unwrap();
    assert_eq!(updated.probability, 100);
    assert!(updated.actual_close_date.is_some());

    let cached = session.store().deals.records.find(deal.id).unwrap();
    assert_eq!(cached.stage, Stage::ClosedWon);
    let current = session.store().deals.records.current.as_ref().unwrap();
    assert_eq!(views::contact_name(current.contact.as_ref()), "Grace Hopper");

    session.dashboard().await.unwrap();
    let stats = session.store().dashboard.stats.as_ref().unwrap();
    assert_eq!(stats.overview.total_revenue, 4_000.0);
    assert_eq!(stats.overview.total_deals, 1);

    session.analytics(Some("7days")).await.unwrap();
    let report = session.store().dashboard.analytics.as_ref().unwrap();
    assert_eq!(report.metrics.closed_deals, 1);
    assert_eq!(report.top_performers.len(), 1);
}

#[tokio::test]
async fn rejected_tokens_are_dropped() {
    let addr = spawn_server().await;
    let client = CrmClient::new(base_url(addr)).with_token("not-a-real-token");
    let mut session = CrmSession::new(client);
    assert!(session.store().auth.is_authenticated());

    let err = session.fetch::<Contact>(ListQuery::default()).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(session.client().token().is_none());
    assert!(!session.store().auth.is_authenticated());
    assert!(session.store().contacts.error.is_some());
}

#[tokio::test]
async fn validation_errors_surface_the_server_message() {
    let addr = spawn_server().await;
    let mut session = signed_in(addr).await;
    let err = session
        .create::<Company>(&NewCompany::default())
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, .. } => assert_eq!(status, 400),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(session.store().companies.error.is_some());
}
