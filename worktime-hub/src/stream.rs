use futures::Stream;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use worktime_core::models::{Principal, SessionEvent};

use crate::hub::{EventHub, Subscription};

/// Default gap between keepalive frames
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Lifecycle of a stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Subscribed, greeting not yet sent
    Connecting,
    Streaming,
    /// Terminal. The mailbox has been released.
    Closed,
}

/// One unit written to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Greeting sent once, before anything else
    Connected,
    /// A session event, `data` being the JSON payload without the type tag
    Event { kind: &'static str, data: String },
    /// Comment frame keeping idle connections open
    KeepAlive,
}

enum Wake {
    Shutdown,
    Mailbox(Option<SessionEvent>),
    KeepAlive,
}

/// A single connected event-stream client.
///
/// Owns the client's hub subscription for its whole life. Whatever ends the
/// session (client gone, server shutdown, mailbox closed) the subscription is
/// released with it.
pub struct StreamSession {
    subscription: Option<Subscription>,
    state: StreamState,
    keepalive: Interval,
    shutdown: CancellationToken,
}

impl StreamSession {
    /// Subscribe on behalf of `principal`: administrators see every event,
    /// everyone else only their own.
    #[must_use]
    pub fn open(
        hub: &EventHub,
        principal: &Principal,
        keepalive: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let subscription = if principal.is_admin() {
            hub.subscribe_admin()
        } else {
            hub.subscribe_user(principal.user_id)
        };

        debug!(
            user_id = %principal.user_id,
            connection_id = %subscription.connection_id(),
            "Event stream opened"
        );

        let period = keepalive.max(Duration::from_millis(1));
        let mut keepalive = interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            subscription: Some(subscription),
            state: StreamState::Connecting,
            keepalive,
            shutdown,
        }
    }

    #[must_use]
    pub const fn state(&self) -> StreamState {
        self.state
    }

    /// Wait for the next frame to write, or `None` once the session is closed.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        match self.state {
            StreamState::Closed => return None,
            StreamState::Connecting => {
                self.state = StreamState::Streaming;
                return Some(Frame::Connected);
            }
            StreamState::Streaming => {}
        }

        loop {
            let wake = {
                let Some(subscription) = self.subscription.as_mut() else {
                    self.close();
                    return None;
                };

                tokio::select! {
                    biased;
                    () = self.shutdown.cancelled() => Wake::Shutdown,
                    event = subscription.recv() => Wake::Mailbox(event),
                    _ = self.keepalive.tick() => Wake::KeepAlive,
                }
            };

            match wake {
                Wake::Shutdown | Wake::Mailbox(None) => {
                    self.close();
                    return None;
                }
                Wake::Mailbox(Some(event)) => match event.payload_json() {
                    Ok(data) => {
                        return Some(Frame::Event {
                            kind: event.event_type(),
                            data,
                        });
                    }
                    // Payloads are plain typed structs, so this only fires if one
                    // grows a field serde_json cannot encode.
                    Err(e) => {
                        warn!(event_type = event.event_type(), error = %e, "Skipping unserializable event");
                    }
                },
                Wake::KeepAlive => return Some(Frame::KeepAlive),
            }
        }
    }

    /// Release the subscription. Idempotent.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            debug!(connection_id = %subscription.connection_id(), "Event stream closed");
        }
        self.state = StreamState::Closed;
    }

    /// Frames as a stream. Dropping the stream closes the session.
    pub fn into_stream(self) -> impl Stream<Item = Frame> + Send {
        futures::stream::unfold(self, |mut session| async move {
            session.next_frame().await.map(|frame| (frame, session))
        })
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("state", &self.state)
            .field("subscription", &self.subscription)
            .finish()
    }
}
