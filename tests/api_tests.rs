// tests/api_tests.rs

use praxis_backend::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Runs against a private in-memory SQLite database, so every test is
/// fully isolated. Returns the base URL and the pool for direct seeding.
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
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

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

async fn register(client: &reqwest::Client, address: &str, email: &str, password: &str) {
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);
}

async fn login(client: &reqwest::Client, address: &str, email: &str, password: &str) -> String {
    let body = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");
    body["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
async fn unknown_path_404() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": unique_email("reg"),
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["role"], "user");
    // The password hash must never leave the server.
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn register_fails_validation() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    // Not an email address
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": "not-an-email",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("dup");

    register(&client, &address, &email, "password123").await;

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn login_touches_last_seen() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("seen");

    register(&client, &address, &email, "password123").await;

    let before: Option<String> =
        sqlx::query_scalar("SELECT last_seen FROM users WHERE email = $1")
            .bind(&email)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(before.is_none());

    let token = login(&client, &address, &email, "password123").await;
    assert!(!token.is_empty());

    let after: Option<String> = sqlx::query_scalar("SELECT last_seen FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(after.is_some());
}

#[tokio::test]
async fn login_with_wrong_password_is_denied() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("wrong");

    register(&client, &address, &email, "password123").await;

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "not-the-password" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn guest_is_blocked_from_dashboard_but_not_profile() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("guest");

    register(&client, &address, &email, "password123").await;
    sqlx::query("UPDATE users SET role = 'guest' WHERE email = $1")
        .bind(&email)
        .execute(&pool)
        .await
        .unwrap();
    let token = login(&client, &address, &email, "password123").await;

    let dashboard = client
        .get(format!("{}/api/assignments", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(dashboard.status().as_u16(), 403);

    let profile = client
        .get(format!("{}/api/profile/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(profile.status().as_u16(), 200);
    let me: serde_json::Value = profile.json().await.unwrap();
    assert_eq!(me["role"], "guest");
    assert_eq!(me["pending_assignments"], 0);
}

#[tokio::test]
async fn preferences_roundtrip() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("prefs");

    register(&client, &address, &email, "password123").await;
    let token = login(&client, &address, &email, "password123").await;

    let response = client
        .put(format!("{}/api/profile/preferences", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "language": "de", "theme": "dark" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let me: serde_json::Value = client
        .get(format!("{}/api/profile/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["language"], "de");
    assert_eq!(me["theme"], "dark");
}

#[tokio::test]
async fn admin_user_crud() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_email = unique_email("admin");

    register(&client, &address, &admin_email, "password123").await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE email = $1")
        .bind(&admin_email)
        .execute(&pool)
        .await
        .unwrap();
    let token = login(&client, &address, &admin_email, "password123").await;

    // Non-admin callers are rejected outright
    let other_email = unique_email("plain");
    register(&client, &address, &other_email, "password123").await;
    let other_token = login(&client, &address, &other_email, "password123").await;
    let denied = client
        .get(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", other_token))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status().as_u16(), 403);

    // Create a user with an explicit role
    let created = client
        .post(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "email": unique_email("created"),
            "name": "Created User",
            "password": "password123",
            "role": "guest"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let created_id = created.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    // Promote them
    let updated = client
        .put(format!("{}/api/admin/users/{}", address, created_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "role": "user" }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status().as_u16(), 200);
    let role: String = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(created_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(role, "user");

    // Self-deletion is refused
    let admin_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&admin_email)
        .fetch_one(&pool)
        .await
        .unwrap();
    let self_delete = client
        .delete(format!("{}/api/admin/users/{}", address, admin_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(self_delete.status().as_u16(), 400);

    // Deleting someone else works
    let deleted = client
        .delete(format!("{}/api/admin/users/{}", address, created_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);
}
