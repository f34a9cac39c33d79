mod common;

use axum::http::StatusCode;
use common::{TestApp, id_of};
use serde_json::{Value, json};

#[tokio::test]
async fn completing_a_task_stamps_and_logs_once() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let (status, task) = app
        .post(
            "/api/tasks",
            &admin.token,
            json!({ "title": "Call back", "dueDate": "2030-01-01", "assignedTo": admin.id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "todo");
    assert_eq!(task["priority"], "medium");
    assert_eq!(task["completedAt"], Value::Null);
    let id = id_of(&task);

    let (_, done) = app
        .put(&format!("/api/tasks/{id}"), &admin.token, json!({ "status": "completed" }))
        .await;
    assert_eq!(done["status"], "completed");
    assert!(done["completedAt"].is_string());

    // A second save while already completed is not a new completion.
    app.put(&format!("/api/tasks/{id}"), &admin.token, json!({ "status": "completed", "notes": "done" }))
        .await;

    let (_, feed) = app.get(&format!("/api/tasks/{id}/activities"), &admin.token).await;
    let kinds: Vec<&str> = feed
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.iter().filter(|kind| **kind == "task_completed").count(), 1);
    assert_eq!(kinds.iter().filter(|kind| **kind == "task_created").count(), 1);
}

#[tokio::test]
async fn task_list_orders_by_due_then_priority() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    for (title, due, priority) in [
        ("later", "2030-02-01", "urgent"),
        ("soon-low", "2030-01-01", "low"),
        ("soon-urgent", "2030-01-01", "urgent"),
        ("soon-high", "2030-01-01", "high"),
    ] {
        app.post(
            "/api/tasks",
            &admin.token,
            json!({ "title": title, "dueDate": due, "priority": priority, "assignedTo": admin.id }),
        )
        .await;
    }

    let (status, body) = app.get("/api/tasks", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["soon-urgent", "soon-high", "soon-low", "later"]);
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn my_tasks_only_returns_open_work_of_the_caller() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let sales = app.register("Sam", "sam@example.com").await;
    let company = app.company(&admin.token, "Initech").await;

    app.post(
        "/api/tasks",
        &admin.token,
        json!({
            "title": "Demo for Initech",
            "dueDate": "2030-01-03",
            "assignedTo": sales.id,
            "relatedTo": { "type": "company", "id": company },
        }),
    )
    .await;
    app.post(
        "/api/tasks",
        &admin.token,
        json!({ "title": "Already done", "dueDate": "2030-01-01", "assignedTo": sales.id, "status": "completed" }),
    )
    .await;
    app.post(
        "/api/tasks",
        &admin.token,
        json!({ "title": "Admin chore", "dueDate": "2030-01-02", "assignedTo": admin.id }),
    )
    .await;

    let (status, mine) = app.get("/api/tasks/my-tasks", &sales.token).await;
    assert_eq!(status, StatusCode::OK);
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["title"], "Demo for Initech");
    assert_eq!(mine[0]["relatedTo"], json!({ "type": "company", "id": company }));
    assert_eq!(mine[0]["related"]["type"], "company");
    assert_eq!(mine[0]["related"]["record"]["name"], "Initech");

    let (_, done) = app.get("/api/tasks/my-tasks?status=completed", &sales.token).await;
    assert_eq!(done.as_array().unwrap().len(), 1);
    assert!(done[0]["completedAt"].is_string());

    let (status, _) = app.get("/api/tasks/my-tasks?status=finished", &sales.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn task_target_can_be_cleared_with_null() {
    let app = TestApp::new().await;
    let admin = app.register("Ada", "ada@example.com").await;
    let contact = app.contact(&admin.token, "Grace", None).await;
    let (_, task) = app
        .post(
            "/api/tasks",
            &admin.token,
            json!({
                "title": "Follow up",
                "dueDate": "2030-01-01",
                "assignedTo": admin.id,
                "relatedTo": { "type": "contact", "id": contact },
            }),
        )
        .await;
    assert_eq!(task["relatedTo"]["type"], "contact");
    let id = id_of(&task);

    let (_, task) = app
        .put(&format!("/api/tasks/{id}"), &admin.token, json!({ "relatedTo": null }))
        .await;
    assert_eq!(task["relatedTo"], Value::Null);
    assert_eq!(task["title"], "Follow up");

    let (status, body) = app
        .post("/api/tasks", &admin.token, json!({ "title": "No due", "assignedTo": admin.id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Due date is required");
}
