use std::net::TcpListener;

use alpha_creator::configuration::get_configuration;
use alpha_creator::startup::{get_connection_pool, run};
use alpha_creator::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    let configuration = get_configuration().map_err(|e| {
        tracing::error!(error = %e, "Failed to read configuration");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let pool = get_connection_pool(&configuration.database).map_err(|e| {
        tracing::error!(error = %e, "Invalid database configuration");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Database configuration error")
    })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to run database migrations");
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Database migration error")
    })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(%address, "Server listening");

    run(listener, pool, configuration)?.await
}
