//! Server-Sent Events push channel.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::{Stream, StreamExt};

use doorhub_app::ports::RelayOutput;
use doorhub_domain::event::PushEvent;

use crate::state::AppState;

/// `GET /sse` — named events keeping a viewer's device status in sync.
///
/// The stream opens with one `<device>_status` event per device, then
/// forwards every `message` and `<device>_status` event as it is published.
/// It ends when the client disconnects.
pub async fn stream<R>(
    State(state): State<AppState<R>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    R: RelayOutput + 'static,
{
    tracing::debug!(
        subscribers = state.broadcaster.subscriber_count() + 1,
        "push subscriber connected"
    );
    let events = state.broadcaster.subscribe().map(|event| Ok(to_sse(event)));
    Sse::new(events).keep_alive(KeepAlive::default())
}

fn to_sse(event: PushEvent) -> Event {
    Event::default().event(event.topic).data(event.payload)
}
