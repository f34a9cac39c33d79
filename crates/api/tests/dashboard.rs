mod common;

use axum::http::StatusCode;
use common::{TestApp, id_of};
use serde_json::json;

#[tokio::test]
async fn dashboard_stats_summarise_the_book() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let company = app.company(&admin.token, "Acme").await;
    let contact = app.contact(&admin.token, "Wile", Some(company)).await;
    for (title, value, stage) in [("Won", 1_000.0, "closed_won"), ("Open", 400.0, "proposal")] {
        app.deal(
            &admin.token,
            json!({
                "title": title,
                "value": value,
                "stage": stage,
                "expectedCloseDate": "2030-01-01",
                "contact": contact,
                "company": company,
            }),
        )
        .await;
    }
    app.post(
        "/api/tasks",
        &admin.token,
        json!({ "title": "Upcoming", "dueDate": "2099-01-01", "assignedTo": admin.id }),
    )
    .await;

    let (status, stats) = app.get("/api/dashboard/stats", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["overview"]["totalContacts"], 1);
    assert_eq!(stats["overview"]["totalCompanies"], 1);
    assert_eq!(stats["overview"]["totalDeals"], 2);
    assert_eq!(stats["overview"]["pendingTasks"], 1);
    assert_eq!(stats["overview"]["totalRevenue"], 1_000.0);
    assert_eq!(stats["dealsByStage"].as_array().unwrap().len(), 2);
    assert_eq!(stats["monthlyRevenue"][0]["revenue"], 1_000.0);
    assert_eq!(stats["upcomingTasks"][0]["title"], "Upcoming");
    assert_eq!(stats["recentDeals"].as_array().unwrap().len(), 2);
    // company, contact, two deals and a task
    assert_eq!(stats["recentActivities"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn analytics_reports_period_metrics() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let company = app.company(&admin.token, "Acme").await;
    let contact = app.contact(&admin.token, "Wile", Some(company)).await;
    let deal = app
        .deal(
            &admin.token,
            json!({
                "title": "Anvils",
                "value": 2_000,
                "expectedCloseDate": "2030-01-01",
                "contact": contact,
                "company": company,
            }),
        )
        .await;
    app.deal(
        &admin.token,
        json!({
            "title": "Skates",
            "value": 500,
            "expectedCloseDate": "2030-01-01",
            "contact": contact,
            "company": company,
        }),
    )
    .await;
    app.put(&format!("/api/deals/{}", id_of(&deal)), &admin.token, json!({ "stage": "closed_won" }))
        .await;

    let (status, report) = app.get("/api/dashboard/analytics?period=7days", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["period"], "7days");
    assert_eq!(report["metrics"]["newContacts"], 1);
    assert_eq!(report["metrics"]["newDeals"], 2);
    assert_eq!(report["metrics"]["closedDeals"], 1);
    assert_eq!(report["metrics"]["revenue"], 2_000.0);
    assert_eq!(report["metrics"]["conversionRate"], 50.0);
    assert_eq!(report["metrics"]["avgDealSize"], 2_000.0);
    assert_eq!(report["topPerformers"][0]["user"]["name"], "Ada");
    assert_eq!(report["topPerformers"][0]["deals"], 1);

    let (status, body) = app.get("/api/dashboard/analytics?period=fortnight", &admin.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("fortnight"));
}

#[tokio::test]
async fn manual_activities_and_timeline() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let contact = app.contact(&admin.token, "Grace", None).await;

    let (status, logged) = app
        .post(
            "/api/activities",
            &admin.token,
            json!({
                "type": "call",
                "title": "Intro call",
                "relatedTo": { "type": "contact", "id": contact },
                "metadata": { "durationMinutes": 15 },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(logged["type"], "call");
    assert_eq!(logged["metadata"], json!({ "durationMinutes": 15 }));

    let (status, _) = app
        .post("/api/activities", &admin.token, json!({ "type": "deal_created", "title": "Forged" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = app.get("/api/activities?type=call", &admin.token).await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["activities"][0]["related"]["record"]["firstName"], "Grace");

    let (status, timeline) = app.get("/api/activities/timeline", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    let days = timeline.as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["activities"].as_array().unwrap().len(), 2);
}
