use crate::broadcast::hub::Frame;
use crate::AppState;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use std::convert::Infallible;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

/// GET /stream, pushing live pipeline events as `text/event-stream`.
///
/// The first frame is always `connected`; after that the subscriber gets
/// every hub event (`heartbeat`, `event.received`, `event.duplicate`,
/// `score.computed`, `broker.stats`) as it occurs. Dropping the connection
/// deregisters the subscriber. Clients are expected to reconnect with
/// exponential backoff: a fixed base delay doubling up to a capped
/// maximum, reset to the base after a successful reconnect.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (connected, rx) = state.hub.subscribe();
    tracing::debug!("stream subscriber connected ({} active)", state.hub.subscriber_count());

    let live = BroadcastStream::new(rx).filter_map(|item| match item {
        Ok(frame) => Some(Ok(to_sse_event(frame))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!("slow stream subscriber skipped {} frames", skipped);
            None
        }
    });

    Sse::new(tokio_stream::once(Ok(to_sse_event(connected))).chain(live))
}

fn to_sse_event(frame: Frame) -> Event {
    Event::default().event(frame.event).data(frame.data)
}
