#![allow(dead_code)]

use alpha_creator::configuration::{get_configuration, DatabaseSettings, Settings};
use alpha_creator::startup::{get_connection_pool, run};
use alpha_creator::telemetry::try_init_telemetry;
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::net::TcpListener;

pub const PASSWORD: &str = "SecurePass123";

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a user and returns the auth response body.
    pub async fn register(&self, email: &str, username: &str) -> Value {
        let response = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "email": email, "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(201, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    /// Registers a user and returns its access token.
    pub async fn access_token(&self, email: &str, username: &str) -> String {
        self.register(email, username).await["access_token"]
            .as_str()
            .expect("access_token missing")
            .to_string()
    }
}

fn test_configuration() -> Settings {
    try_init_telemetry("warn");

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.mock_feed.enabled = false;
    configuration.application.story_purge_interval_seconds = 0;
    // Nothing listens here, so verification mail fails fast and is only logged.
    configuration.email_client.base_url = "http://127.0.0.1:9".to_string();
    configuration.email_client.timeout_milliseconds = 200;
    configuration
}

fn serve(configuration: Settings, pool: PgPool) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = run(listener, pool.clone(), configuration).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        db_pool: pool,
        client: reqwest::Client::new(),
    }
}

/// Server whose pool never connects; for requests rejected before any query.
pub fn spawn_app_without_db() -> TestApp {
    spawn_app_without_db_with(|_| {})
}

/// Same as [`spawn_app_without_db`] with a tweaked configuration.
pub fn spawn_app_without_db_with(customise: impl FnOnce(&mut Settings)) -> TestApp {
    let mut configuration = test_configuration();
    customise(&mut configuration);
    let pool = get_connection_pool(&configuration.database).expect("Invalid database settings");
    serve(configuration, pool)
}

/// Server backed by a fresh, migrated database.
pub async fn spawn_app() -> TestApp {
    let mut configuration = test_configuration();
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    let pool = configure_database(&configuration.database).await;
    serve(configuration, pool)
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}
