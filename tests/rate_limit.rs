mod common;

use common::spawn_app_without_db_with;
use serde_json::Value;

#[tokio::test]
async fn rate_limit_returns_429_once_bucket_is_empty() {
    let app = spawn_app_without_db_with(|c| c.security.requests_per_minute = 3);

    for _ in 0..3 {
        let response = app
            .client
            .get(app.url("/health_check"))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(200, response.status().as_u16());
    }

    let response = app
        .client
        .get(app.url("/health_check"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(429, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn forwarded_headers_do_not_reset_the_bucket() {
    let app = spawn_app_without_db_with(|c| c.security.requests_per_minute = 3);

    let mut statuses = Vec::new();
    for i in 0..5 {
        let response = app
            .client
            .get(app.url("/health_check"))
            .header("x-forwarded-for", format!("203.0.113.{}", i))
            .header("forwarded", format!("for=198.51.100.{}", i))
            .send()
            .await
            .expect("Failed to execute request");
        statuses.push(response.status().as_u16());
    }

    assert_eq!(statuses, vec![200, 200, 200, 429, 429]);
}
