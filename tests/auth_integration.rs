mod common;

use alpha_creator::auth::OneTimeToken;
use common::{spawn_app, spawn_app_without_db, TestApp, PASSWORD};
use serde_json::{json, Value};

/// Replaces the mailed token with a known one; only its hash is stored.
async fn plant_token(app: &TestApp, email: &str, column: &str, token: &str) {
    sqlx::query(&format!(
        "UPDATE users SET {0}_hash = $1, {0}_expires_at = NOW() + INTERVAL '1 hour' WHERE email = $2",
        column
    ))
    .bind(OneTimeToken::hash(token))
    .bind(email)
    .execute(&app.db_pool)
    .await
    .expect("Failed to plant token");
}

// --- Requests rejected before touching the database ---

#[tokio::test]
async fn protected_route_without_token_returns_401() {
    let app = spawn_app_without_db();

    for path in ["/api/v1/auth/me", "/api/v1/campaigns", "/api/instagram/posts", "/api/youtube/videos"] {
        let response = app
            .client
            .get(app.url(path))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(401, response.status().as_u16(), "path: {}", path);
        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn garbage_token_returns_401_token_invalid() {
    let app = spawn_app_without_db();

    let response = app
        .client
        .get(app.url("/api/v1/auth/me"))
        .bearer_auth("not.a.jwt")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn register_returns_400_for_invalid_input() {
    let app = spawn_app_without_db();

    let cases = vec![
        (json!({"email": "notanemail", "username": "alice", "password": PASSWORD}), "bad email"),
        (json!({"email": "a@example.com", "username": "a", "password": PASSWORD}), "short username"),
        (json!({"email": "a@example.com", "username": "alice", "password": "weak"}), "weak password"),
        (json!({"email": "a@example.com", "username": "alice"}), "missing password"),
    ];

    for (body, case) in cases {
        let response = app
            .client
            .post(app.url("/api/v1/auth/register"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(400, response.status().as_u16(), "case: {}", case);
        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["code"], "VALIDATION_ERROR", "case: {}", case);
    }
}

// --- Database-backed flows ---

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn register_returns_201_with_token_pair() {
    let app = spawn_app().await;

    let body = app.register("john@example.com", "john").await;

    assert_eq!(body["token_type"], "Bearer");
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["user"]["email"], "john@example.com");
    assert_eq!(body["user"]["is_verified"], false);

    let (stored,): (Option<String>,) =
        sqlx::query_as("SELECT refresh_token_hash FROM users WHERE email = 'john@example.com'")
            .fetch_one(&app.db_pool)
            .await
            .expect("Failed to fetch created user");
    assert!(stored.is_some());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn register_duplicate_email_returns_409() {
    let app = spawn_app().await;
    app.register("dup@example.com", "first").await;

    let response = app
        .client
        .post(app.url("/api/v1/auth/register"))
        .json(&json!({"email": "dup@example.com", "username": "second", "password": PASSWORD}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "DUPLICATE_ENTRY");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn login_failures_share_one_message() {
    let app = spawn_app().await;
    app.register("jane@example.com", "jane").await;

    let wrong_password = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&json!({"email": "jane@example.com", "password": "WrongPass123"}))
        .send()
        .await
        .expect("Failed to execute request.");
    let unknown_email = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&json!({"email": "nobody@example.com", "password": PASSWORD}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());
    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_email.json().await.unwrap();
    assert_eq!(a["message"], b["message"]);
    assert_eq!(a["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn account_locks_after_repeated_failures() {
    let app = spawn_app().await;
    app.register("locked@example.com", "locked").await;

    for _ in 0..5 {
        let response = app
            .client
            .post(app.url("/api/v1/auth/login"))
            .json(&json!({"email": "locked@example.com", "password": "WrongPass123"}))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(401, response.status().as_u16());
    }

    let response = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&json!({"email": "locked@example.com", "password": PASSWORD}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "ACCOUNT_LOCKED");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn refresh_rotates_and_rejects_previous_token() {
    let app = spawn_app().await;
    let registered = app.register("rotate@example.com", "rotate").await;
    let original = registered["refresh_token"].as_str().unwrap().to_string();

    // JWTs are second-granular; make sure the rotated token differs.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let response = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .json(&json!({ "refresh_token": original }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let rotated: Value = response.json().await.unwrap();
    assert_ne!(rotated["refresh_token"].as_str().unwrap(), original);

    let replay = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .json(&json!({ "refresh_token": original }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, replay.status().as_u16());
    let body: Value = replay.json().await.unwrap();
    assert_eq!(body["code"], "TOKEN_INVALID");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn logout_invalidates_refresh_token() {
    let app = spawn_app().await;
    let registered = app.register("bye@example.com", "bye").await;
    let access = registered["access_token"].as_str().unwrap();
    let refresh = registered["refresh_token"].as_str().unwrap();

    let response = app
        .client
        .post(app.url("/api/v1/auth/logout"))
        .bearer_auth(access)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let response = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn me_returns_current_profile() {
    let app = spawn_app().await;
    let token = app.access_token("me@example.com", "me_user").await;

    let response = app
        .client
        .get(app.url("/api/v1/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], "me_user");
    assert_eq!(body["role"], "user");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn non_admin_cannot_list_users() {
    let app = spawn_app().await;
    let token = app.access_token("plain@example.com", "plain").await;

    let response = app
        .client
        .get(app.url("/api/v1/admin/users"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn verification_token_is_single_use() {
    let app = spawn_app().await;
    let registered = app.register("verify@example.com", "verify").await;
    let access = registered["access_token"].as_str().unwrap();
    plant_token(&app, "verify@example.com", "verification_token", "verify-me-once").await;

    let response = app
        .client
        .get(app.url("/api/v1/auth/verify-email?token=verify-me-once"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let me: Value = app
        .client
        .get(app.url("/api/v1/auth/me"))
        .bearer_auth(access)
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .unwrap();
    assert_eq!(me["is_verified"], true);

    let replay = app
        .client
        .get(app.url("/api/v1/auth/verify-email?token=verify-me-once"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(400, replay.status().as_u16());
    let body: Value = replay.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn password_reset_revokes_refresh_token() {
    let app = spawn_app().await;
    let registered = app.register("reset@example.com", "reset").await;
    let refresh = registered["refresh_token"].as_str().unwrap();

    let response = app
        .client
        .post(app.url("/api/v1/auth/forgot-password"))
        .json(&json!({ "email": "reset@example.com" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let (stored,): (Option<String>,) =
        sqlx::query_as("SELECT reset_token_hash FROM users WHERE email = 'reset@example.com'")
            .fetch_one(&app.db_pool)
            .await
            .expect("Failed to fetch user");
    assert!(stored.is_some());

    plant_token(&app, "reset@example.com", "reset_token", "reset-me-once").await;
    let reset = json!({ "token": "reset-me-once", "password": "BrandNewPass456" });

    let response = app
        .client
        .post(app.url("/api/v1/auth/reset-password"))
        .json(&reset)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let response = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());

    let response = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&json!({ "email": "reset@example.com", "password": "BrandNewPass456" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let replay = app
        .client
        .post(app.url("/api/v1/auth/reset-password"))
        .json(&reset)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(400, replay.status().as_u16());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn forgot_password_answers_200_for_unknown_email() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/v1/auth/forgot-password"))
        .json(&json!({ "email": "ghost@example.com" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
}
