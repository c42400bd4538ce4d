// tests/comment_tests.rs

use praxis_backend::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

async fn spawn_app() -> (String, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "comment_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

async fn signup(
    client: &reqwest::Client,
    address: &str,
    pool: &SqlitePool,
    prefix: &str,
    admin: bool,
) -> (i64, String) {
    let email = unique_email(prefix);
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);
    let id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    if admin {
        sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }

    let body = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .unwrap();
    (id, body["token"].as_str().unwrap().to_string())
}

/// Creates a survey, assigns it and submits a result.
/// Returns (survey_id, assignment_id, result_id).
async fn completed_assignment(
    client: &reqwest::Client,
    address: &str,
    admin_token: &str,
    user_id: i64,
    user_token: &str,
) -> (i64, i64, i64) {
    let survey_id = client
        .post(format!("{}/api/admin/surveys", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "title": "Session follow-up",
            "questions": [{ "text": "How did the session land?", "question_type": "scale" }]
        }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let assignment_id = client
        .post(format!("{}/api/admin/assignments", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "survey_id": survey_id, "user_id": user_id }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let result_id = client
        .post(format!("{}/api/assignments/{}/result", address, assignment_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .json(&serde_json::json!({ "answers": {} }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    (survey_id, assignment_id, result_id)
}

#[tokio::test]
async fn comment_read_flags_default_opposite_to_author_role() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin_token) = signup(&client, &address, &pool, "admin", true).await;
    let (user_id, user_token) = signup(&client, &address, &pool, "member", false).await;

    let (_, _, result_id) =
        completed_assignment(&client, &address, &admin_token, user_id, &user_token).await;

    // Admin comment: already read by its author, unread for the user
    let admin_comment = client
        .post(format!("{}/api/admin/results/{}/comments", address, result_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "text": "Thanks for filling this in." }))
        .send()
        .await
        .unwrap();
    assert_eq!(admin_comment.status().as_u16(), 201);

    // User comment: the inverse
    let user_comment = client
        .post(format!("{}/api/results/{}/comments", address, result_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .json(&serde_json::json!({ "text": "Happy to, see you next week." }))
        .send()
        .await
        .unwrap();
    assert_eq!(user_comment.status().as_u16(), 201);

    let thread: serde_json::Value = client
        .get(format!("{}/api/results/{}/comments", address, result_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let comments = thread.as_array().unwrap();
    assert_eq!(comments.len(), 2);

    assert_eq!(comments[0]["is_read_by_admin"], true);
    assert_eq!(comments[0]["is_read_by_user"], false);
    // Viewed as the user, the admin's comment is new
    assert_eq!(comments[0]["is_new"], true);

    assert_eq!(comments[1]["is_read_by_admin"], false);
    assert_eq!(comments[1]["is_read_by_user"], true);
    assert_eq!(comments[1]["is_new"], false);
}

#[tokio::test]
async fn non_owner_cannot_comment_or_read_thread() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin_token) = signup(&client, &address, &pool, "admin", true).await;
    let (user_id, user_token) = signup(&client, &address, &pool, "owner", false).await;
    let (_, intruder_token) = signup(&client, &address, &pool, "intruder", false).await;

    let (_, _, result_id) =
        completed_assignment(&client, &address, &admin_token, user_id, &user_token).await;

    let posted = client
        .post(format!("{}/api/results/{}/comments", address, result_id))
        .header("Authorization", format!("Bearer {}", intruder_token))
        .json(&serde_json::json!({ "text": "Should not land" }))
        .send()
        .await
        .unwrap();
    assert_eq!(posted.status().as_u16(), 404);

    let listed = client
        .get(format!("{}/api/results/{}/comments", address, result_id))
        .header("Authorization", format!("Bearer {}", intruder_token))
        .send()
        .await
        .unwrap();
    assert_eq!(listed.status().as_u16(), 404);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn user_badge_and_mark_read_are_idempotent() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin_token) = signup(&client, &address, &pool, "admin", true).await;
    let (user_id, user_token) = signup(&client, &address, &pool, "member", false).await;

    let (_, _, result_id) =
        completed_assignment(&client, &address, &admin_token, user_id, &user_token).await;

    client
        .post(format!("{}/api/admin/results/{}/comments", address, result_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "text": "A note from your therapist." }))
        .send()
        .await
        .unwrap();

    // The user's assignment list carries the unread badge
    let listed: serde_json::Value = client
        .get(format!("{}/api/assignments", address))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed[0]["unread_comments"], 1);

    // First bulk mark-read flips the row, the second is a no-op
    let first: serde_json::Value = client
        .post(format!("{}/api/results/{}/comments/read", address, result_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["marked"], 1);

    let second: serde_json::Value = client
        .post(format!("{}/api/results/{}/comments/read", address, result_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["marked"], 0);

    let listed: serde_json::Value = client
        .get(format!("{}/api/assignments", address))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed[0]["unread_comments"], 0);
}

#[tokio::test]
async fn admin_badge_tracks_unread_surveys() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin_token) = signup(&client, &address, &pool, "admin", true).await;
    let (user_id, user_token) = signup(&client, &address, &pool, "member", false).await;

    let (survey_id, _, result_id) =
        completed_assignment(&client, &address, &admin_token, user_id, &user_token).await;

    let badge = |client: &reqwest::Client| {
        let address = address.clone();
        let token = admin_token.clone();
        let client = client.clone();
        async move {
            client
                .get(format!("{}/api/admin/unread-surveys", address))
                .header("Authorization", format!("Bearer {}", token))
                .send()
                .await
                .unwrap()
                .json::<serde_json::Value>()
                .await
                .unwrap()["unread_surveys"]
                .as_i64()
                .unwrap()
        }
    };

    assert_eq!(badge(&client).await, 0);

    client
        .post(format!("{}/api/results/{}/comments", address, result_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .json(&serde_json::json!({ "text": "I had a question about this one." }))
        .send()
        .await
        .unwrap();

    assert_eq!(badge(&client).await, 1);

    let first: serde_json::Value = client
        .post(format!("{}/api/admin/surveys/{}/comments/read", address, survey_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["marked"], 1);

    let second: serde_json::Value = client
        .post(format!("{}/api/admin/surveys/{}/comments/read", address, survey_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["marked"], 0);

    assert_eq!(badge(&client).await, 0);
}

#[tokio::test]
async fn admin_can_clear_a_thread() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin_token) = signup(&client, &address, &pool, "admin", true).await;
    let (user_id, user_token) = signup(&client, &address, &pool, "member", false).await;

    let (_, _, result_id) =
        completed_assignment(&client, &address, &admin_token, user_id, &user_token).await;

    for text in ["one", "two", "three"] {
        client
            .post(format!("{}/api/results/{}/comments", address, result_id))
            .header("Authorization", format!("Bearer {}", user_token))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .unwrap();
    }

    let cleared: serde_json::Value = client
        .delete(format!("{}/api/admin/results/{}/comments", address, result_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleared["deleted"], 3);

    let thread: serde_json::Value = client
        .get(format!("{}/api/results/{}/comments", address, result_id))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(thread.as_array().unwrap().len(), 0);
}
