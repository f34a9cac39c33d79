mod common;

use common::PgTestContext;
use serde_json::json;

#[tokio::test]
async fn postgres_full_text_search_matches_words() {
    let Some(ctx) = PgTestContext::new().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping postgres search test");
        return;
    };
    let app = &ctx.app;
    let admin = app.register("Ada", "ada@example.com").await;
    let company = app.company(&admin.token, "Globex Corporation").await;
    app.company(&admin.token, "Initech").await;
    let contact = app.contact(&admin.token, "Hank", Some(company)).await;
    app.deal(
        &admin.token,
        json!({
            "title": "Hammock district expansion",
            "value": 10_000,
            "expectedCloseDate": "2030-01-01",
            "contact": contact,
            "company": company,
        }),
    )
    .await;

    let (_, companies) = app.get("/api/companies?search=globex", &admin.token).await;
    assert_eq!(companies["total"], 1);
    assert_eq!(companies["companies"][0]["name"], "Globex Corporation");

    let (_, contacts) = app.get("/api/contacts?search=hank", &admin.token).await;
    assert_eq!(contacts["total"], 1);

    let (_, deals) = app.get("/api/deals?search=hammock", &admin.token).await;
    assert_eq!(deals["total"], 1);

    ctx.cleanup().await;
}
