//! Resets the database to the demo data set.
//!
//! Uses the same configuration as the server (`configuration.yaml` plus
//! `APP__*` overrides).

use alpha_creator::configuration::get_configuration;
use alpha_creator::seed::{seed, DEMO_EMAIL, DEMO_PASSWORD};
use alpha_creator::startup::get_connection_pool;
use alpha_creator::telemetry::try_init_telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    try_init_telemetry("info");

    let configuration = get_configuration()?;
    let pool = get_connection_pool(&configuration.database)?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied");

    let summary = seed(&pool).await?;
    tracing::info!(
        users = summary.users,
        campaigns = summary.campaigns,
        ads = summary.ads,
        analytics_rows = summary.analytics_rows,
        posts = summary.posts,
        stories = summary.stories,
        channels = summary.channels,
        videos = summary.videos,
        "Seed complete"
    );
    tracing::info!(email = DEMO_EMAIL, password = DEMO_PASSWORD, "Demo login");

    Ok(())
}
