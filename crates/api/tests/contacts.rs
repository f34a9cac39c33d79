mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, id_of};
use serde_json::json;

#[tokio::test]
async fn contact_list_pages_with_clamped_limit() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    for n in 0..15 {
        app.contact(&admin.token, &format!("Person{n}"), None).await;
    }

    let (status, body) = app.get("/api/contacts?page=2&limit=10", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contacts"].as_array().unwrap().len(), 5);
    assert_eq!(body["total"], 15);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 2);

    let (_, body) = app.get("/api/contacts?limit=1000", &admin.token).await;
    assert_eq!(body["contacts"].as_array().unwrap().len(), 15);
    assert_eq!(body["totalPages"], 1);
}

#[tokio::test]
async fn out_of_range_pages_are_rejected() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    app.contact(&admin.token, "Grace", None).await;

    for uri in [
        "/api/contacts?page=18446744073709551615&limit=10",
        "/api/contacts?page=1000000000000000001&limit=10",
    ] {
        let (status, body) = app.get(uri, &admin.token).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
        assert_eq!(body["message"], "Page is out of range");
    }

    let (status, body) = app.get("/api/contacts?page=9&limit=10", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["contacts"].as_array().unwrap().is_empty());
    assert_eq!(body["currentPage"], 9);
}

#[tokio::test]
async fn creating_a_contact_logs_one_activity() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let id = app.contact(&admin.token, "Grace", None).await;

    let (status, feed) = app
        .get(&format!("/api/contacts/{id}/activities"), &admin.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["type"], "contact_created");
    assert_eq!(feed[0]["relatedTo"], json!({ "type": "contact", "id": id }));
    assert_eq!(feed[0]["user"]["id"], json!(admin.id));
}

#[tokio::test]
async fn creating_a_company_logs_one_activity() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let id = app.company(&admin.token, "Initech").await;

    let (status, feed) = app
        .get(&format!("/api/companies/{id}/activities"), &admin.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["type"], "company_created");
    assert_eq!(feed[0]["relatedTo"], json!({ "type": "company", "id": id }));
}

#[tokio::test]
async fn contact_detail_embeds_company_and_search_filters() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let company = app.company(&admin.token, "Initech").await;
    let id = app.contact(&admin.token, "Peter", Some(company)).await;
    app.contact(&admin.token, "Milton", None).await;

    let (status, body) = app.get(&format!("/api/contacts/{id}"), &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["company"]["name"], "Initech");
    assert_eq!(body["owner"]["name"], "Ada");

    let (_, body) = app.get("/api/contacts?search=pet", &admin.token).await;
    let contacts = body["contacts"].as_array().unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0]["firstName"], "Peter");
    assert_eq!(contacts[0]["company"]["name"], "Initech");
}

#[tokio::test]
async fn contact_validation_and_missing_records() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;

    let (status, body) = app
        .post("/api/contacts", &admin.token, json!({ "lastName": "Nobody", "email": "n@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "First name is required");

    let (status, body) = app
        .post(
            "/api/contacts",
            &admin.token,
            json!({ "firstName": "A", "lastName": "B", "email": "not-an-email" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("email"));

    let missing = uuid::Uuid::new_v4();
    let (status, body) = app.get(&format!("/api/contacts/{missing}"), &admin.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Contact not found");

    let (status, body) = app.get("/api/contacts/not-a-uuid", &admin.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());

    let (status, _) = app.delete(&format!("/api/contacts/{missing}"), &admin.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn contact_patch_keeps_absent_fields_and_clears_nulls() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let (_, created) = app
        .post(
            "/api/contacts",
            &admin.token,
            json!({
                "firstName": "Linus",
                "lastName": "Tester",
                "email": "LINUS@Example.com",
                "phone": "555-0100",
                "title": "Engineer",
            }),
        )
        .await;
    assert_eq!(created["email"], "linus@example.com");
    let id = id_of(&created);

    let (status, body) = app
        .put(&format!("/api/contacts/{id}"), &admin.token, json!({ "phone": null, "status": "customer" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phone"], serde_json::Value::Null);
    assert_eq!(body["title"], "Engineer");
    assert_eq!(body["status"], "customer");

    let (status, _) = app
        .put(&format!("/api/contacts/{id}"), &admin.token, json!({ "firstName": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_contact_leaves_its_deals_with_a_null_reference() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let company = app.company(&admin.token, "Acme").await;
    let contact = app.contact(&admin.token, "Wile", Some(company)).await;
    let deal = app
        .deal(
            &admin.token,
            json!({
                "title": "Anvils",
                "value": 1000,
                "expectedCloseDate": "2030-01-01",
                "contact": contact,
                "company": company,
            }),
        )
        .await;
    let deal_id = id_of(&deal);

    let (status, body) = app.delete(&format!("/api/contacts/{contact}"), &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Contact deleted successfully");

    let (status, body) = app.get(&format!("/api/deals/{deal_id}"), &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contact"], serde_json::Value::Null);
    assert_eq!(body["company"]["name"], "Acme");
}

#[tokio::test]
async fn company_sub_resources_list_referencing_records() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let company = app.company(&admin.token, "Globex").await;
    let contact = app.contact(&admin.token, "Hank", Some(company)).await;
    app.contact(&admin.token, "Homer", None).await;
    app.deal(
        &admin.token,
        json!({
            "title": "Platform",
            "value": 5000,
            "expectedCloseDate": "2030-06-01T00:00:00Z",
            "contact": contact,
            "company": company,
        }),
    )
    .await;

    let (status, contacts) = app
        .get(&format!("/api/companies/{company}/contacts"), &admin.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contacts.as_array().unwrap().len(), 1);

    let (_, deals) = app.get(&format!("/api/companies/{company}/deals"), &admin.token).await;
    assert_eq!(deals.as_array().unwrap().len(), 1);
    assert_eq!(deals[0]["contact"]["firstName"], "Hank");

    let missing = uuid::Uuid::new_v4();
    let (status, _) = app
        .request(Method::GET, &format!("/api/companies/{missing}/deals"), Some(&admin.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
