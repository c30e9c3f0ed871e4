// Server-sent event stream of session changes

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue},
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use worktime_hub::{Frame, StreamSession};

use super::{middleware::AuthUser, AppState};

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Open a stream of session events for the caller.
///
/// Administrators receive every event, other users only events about their
/// own sessions. The connection stays open until the client leaves or the
/// server shuts down.
pub async fn event_stream(State(state): State<AppState>, AuthUser(principal): AuthUser) -> impl IntoResponse {
    let session = StreamSession::open(
        &state.hub,
        &principal,
        state.keepalive_interval,
        state.shutdown.child_token(),
    );

    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (X_ACCEL_BUFFERING, HeaderValue::from_static("no")),
        ],
        Sse::new(sse_events(session)),
    )
}

fn sse_events(session: StreamSession) -> impl Stream<Item = Result<Event, Infallible>> {
    session.into_stream().map(|frame| Ok(frame_to_event(frame)))
}

fn frame_to_event(frame: Frame) -> Event {
    match frame {
        Frame::Connected => Event::default().event("connected").data(r#"{"ok":true}"#),
        Frame::Event { kind, data } => Event::default().event(kind).data(data),
        Frame::KeepAlive => Event::default().comment("keepalive"),
    }
}
