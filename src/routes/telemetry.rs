//! Live telemetry over Server-Sent Events

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use futures::{stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;

use crate::domain::user::AuthenticatedUser;
use crate::mock_feed::{FeedBus, FeedEvent};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
const KEEP_ALIVE_FRAME: &str = ": keep-alive\n\n";
const RETRY_FRAME: &str = "retry: 3000\n\n";

/// Waits for the next frame to send. `None` ends the stream.
async fn next_frame(rx: &mut Receiver<FeedEvent>, keep_alive: Duration) -> Option<String> {
    match tokio::time::timeout(keep_alive, rx.recv()).await {
        Err(_) => Some(KEEP_ALIVE_FRAME.to_string()),
        Ok(Ok(event)) => match event.to_sse_frame() {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::error!(error = %e, event = event.name(), "Failed to encode telemetry event");
                Some(KEEP_ALIVE_FRAME.to_string())
            }
        },
        Ok(Err(RecvError::Lagged(skipped))) => {
            tracing::warn!(skipped, "Telemetry subscriber lagging");
            let data = serde_json::json!({
                "message": "Client is too slow, events were dropped",
                "skipped": skipped,
            });
            Some(format!("event: warning\ndata: {}\n\n", data))
        }
        Ok(Err(RecvError::Closed)) => None,
    }
}

/// GET /api/v1/telemetry/stream
pub async fn telemetry_stream(user: AuthenticatedUser, bus: web::Data<FeedBus>) -> HttpResponse {
    tracing::info!(user_id = %user.id, "Telemetry client connected");

    let rx = bus.subscribe();
    let events = stream::unfold(rx, |mut rx| async move {
        let frame = next_frame(&mut rx, KEEP_ALIVE_INTERVAL).await?;
        Some((frame, rx))
    });
    let body = stream::once(async { RETRY_FRAME.to_string() })
        .chain(events)
        .map(|frame| Ok::<_, Infallible>(web::Bytes::from(frame)));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(body)
}
