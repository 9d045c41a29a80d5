//! Background maintenance jobs

use sqlx::PgPool;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::routes::instagram::purge_expired_stories;

/// Deletes expired stories every `interval`. An interval of zero disables the
/// job.
pub fn spawn_story_purge(pool: PgPool, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        tracing::info!("Story purge disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match purge_expired_stories(&pool).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Purged expired stories"),
                Err(e) => tracing::warn!(error = %e, "Story purge failed"),
            }
        }
    }))
}
