mod common;

use axum::http::StatusCode;
use common::{TestApp, id_of};
use serde_json::{Value, json};
use uuid::Uuid;

struct Fixture {
    app: TestApp,
    token: String,
    contact: Uuid,
    company: Uuid,
}

async fn fixture() -> Fixture {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let company = app.company(&admin.token, "Acme").await;
    let contact = app.contact(&admin.token, "Wile", Some(company)).await;
    Fixture {
        app,
        token: admin.token,
        contact,
        company,
    }
}

impl Fixture {
    async fn deal(&self, title: &str, value: f64, stage: &str) -> Value {
        self.app
            .deal(
                &self.token,
                json!({
                    "title": title,
                    "value": value,
                    "stage": stage,
                    "expectedCloseDate": "2030-01-01",
                    "contact": self.contact,
                    "company": self.company,
                }),
            )
            .await
    }
}

#[tokio::test]
async fn probability_follows_stage_not_the_client() {
    let fx = fixture().await;
    let body = fx
        .app
        .deal(
            &fx.token,
            json!({
                "title": "Anvils",
                "value": 1000,
                "stage": "proposal",
                "probability": 99,
                "expectedCloseDate": "2030-01-01",
                "contact": fx.contact,
                "company": fx.company,
            }),
        )
        .await;
    assert_eq!(body["probability"], 50);
    assert_eq!(body["currency"], "USD");
    let id = id_of(&body);

    let (status, body) = fx
        .app
        .put(&format!("/api/deals/{id}"), &fx.token, json!({ "stage": "negotiation", "probability": 5 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["probability"], 75);

    let (_, body) = fx
        .app
        .put(&format!("/api/deals/{id}"), &fx.token, json!({ "stage": "closed_lost" }))
        .await;
    assert_eq!(body["probability"], 0);
}

#[tokio::test]
async fn closed_won_stamps_actual_close_date_once() {
    let fx = fixture().await;
    let won = fx.deal("Won at once", 500.0, "closed_won").await;
    assert_eq!(won["probability"], 100);
    assert!(won["actualCloseDate"].is_string());

    let open = fx.deal("Later", 700.0, "qualification").await;
    assert_eq!(open["actualCloseDate"], Value::Null);
    let id = id_of(&open);

    let (_, closed) = fx
        .app
        .put(&format!("/api/deals/{id}"), &fx.token, json!({ "stage": "closed_won" }))
        .await;
    let stamped = closed["actualCloseDate"].as_str().unwrap().to_string();

    let (_, again) = fx
        .app
        .put(&format!("/api/deals/{id}"), &fx.token, json!({ "stage": "closed_won", "nextStep": "Invoice" }))
        .await;
    assert_eq!(again["actualCloseDate"], json!(stamped));
    assert_eq!(again["nextStep"], "Invoice");
}

#[tokio::test]
async fn stage_change_is_logged_once_per_transition() {
    let fx = fixture().await;
    let deal = fx.deal("Tracked", 1000.0, "qualification").await;
    let id = id_of(&deal);

    fx.app
        .put(&format!("/api/deals/{id}"), &fx.token, json!({ "stage": "proposal" }))
        .await;
    fx.app
        .put(&format!("/api/deals/{id}"), &fx.token, json!({ "title": "Renamed" }))
        .await;

    let (_, feed) = fx.app.get(&format!("/api/deals/{id}/activities"), &fx.token).await;
    let kinds: Vec<&str> = feed
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.iter().filter(|kind| **kind == "deal_created").count(), 1);
    assert_eq!(kinds.iter().filter(|kind| **kind == "deal_updated").count(), 1);
    let changed = feed
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["type"] == "deal_updated")
        .unwrap();
    assert_eq!(changed["title"], "Deal stage changed: qualification → proposal");
}

#[tokio::test]
async fn pipeline_groups_by_stage_with_sums() {
    let fx = fixture().await;
    fx.deal("A", 40_000.0, "proposal").await;
    fx.deal("B", 50_000.0, "proposal").await;
    fx.deal("C", 60_000.0, "proposal").await;
    fx.deal("D", 20_000.0, "qualification").await;
    fx.deal("E", 30_000.0, "qualification").await;

    let (status, pipeline) = fx.app.get("/api/deals/pipeline", &fx.token).await;
    assert_eq!(status, StatusCode::OK);
    let columns = pipeline.as_array().unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0]["stage"], "proposal");
    assert_eq!(columns[0]["count"], 3);
    assert_eq!(columns[0]["totalValue"], 150_000.0);
    assert_eq!(columns[0]["deals"].as_array().unwrap().len(), 3);
    assert_eq!(columns[1]["stage"], "qualification");
    assert_eq!(columns[1]["totalValue"], 50_000.0);
    assert_eq!(columns[1]["deals"][0]["company"]["name"], "Acme");
}

#[tokio::test]
async fn deal_list_filters_and_reports_stage_stats() {
    let fx = fixture().await;
    fx.deal("Small", 100.0, "qualification").await;
    fx.deal("Medium", 5_000.0, "proposal").await;
    fx.deal("Large", 90_000.0, "proposal").await;

    let (status, body) = fx.app.get("/api/deals?minValue=1000", &fx.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let stats = body["stageStats"].as_array().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0]["stage"], "proposal");
    assert_eq!(stats[0]["count"], 2);
    assert_eq!(stats[0]["totalValue"], 95_000.0);

    let (status, body) = fx.app.get("/api/deals?minValue=10&maxValue=1", &fx.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, _) = fx.app.get("/api/deals?stage=won", &fx.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deal_creation_requires_its_references() {
    let fx = fixture().await;
    let (status, body) = fx
        .app
        .post(
            "/api/deals",
            &fx.token,
            json!({ "title": "Orphan", "value": 10, "expectedCloseDate": "2030-01-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Contact is required");

    let (status, _) = fx
        .app
        .post(
            "/api/deals",
            &fx.token,
            json!({
                "title": "Negative",
                "value": -1,
                "expectedCloseDate": "2030-01-01",
                "contact": fx.contact,
                "company": fx.company,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn product_lines_are_stored_and_validated() {
    let fx = fixture().await;
    let deal = fx
        .app
        .deal(
            &fx.token,
            json!({
                "title": "Bundle",
                "value": 900,
                "expectedCloseDate": "2030-01-01",
                "contact": fx.contact,
                "company": fx.company,
                "products": [{ "name": "Seats", "quantity": 3, "price": 300 }],
            }),
        )
        .await;
    assert_eq!(deal["products"][0]["name"], "Seats");
    assert_eq!(deal["products"][0]["quantity"], 3);

    let id = id_of(&deal);
    let (status, body) = fx
        .app
        .put(
            &format!("/api/deals/{id}"),
            &fx.token,
            json!({ "products": [{ "name": " ", "price": 10 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Product name is required");
}
