use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::state::AppState;

/// GET /events: SSE stream with one `telemetry` event per device status record.
///
/// Subscribers that fall behind skip the records they missed.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let rx = app.service.subscribe_telemetry();
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        let record = msg.ok()?;
        let event = Event::default().event("telemetry").json_data(&record).ok()?;
        Some(Ok::<Event, Infallible>(event))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
