//! Server-Sent Events for a session's generation job.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/sessions/:id/events
///
/// Streams the job as it changes, starting with its current state. Each event
/// is named after the job status and carries the full job as JSON. The stream
/// ends after the first terminal state. Intermediate states may be coalesced
/// when the client reads slower than the poller writes.
pub async fn handle_job_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let updates = state.sessions.observe(id).await?;
    debug!(session_id = %id, "SSE client connected to job events");

    let jobs = stream::unfold((Some(updates), true), |(rx, first)| async move {
        let mut rx = rx?;
        if !first {
            rx.changed().await.ok()?;
        }
        let job = rx.borrow_and_update().clone();
        let next = (!job.is_terminal()).then_some(rx);
        Some((job, (next, false)))
    });

    let stream = jobs.filter_map(|job| {
        let event = match Event::default().event(job.status.name()).json_data(&job) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                warn!("Failed to serialize job event: {e}");
                None
            }
        };
        future::ready(event)
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
