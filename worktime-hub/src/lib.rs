//! In-process fan-out of session events to connected streaming clients.

pub mod hub;
pub mod stream;

pub use hub::{Audience, ConnectionId, EventHub, Subscription, DEFAULT_MAILBOX_CAPACITY};
pub use stream::{Frame, StreamSession, StreamState, DEFAULT_KEEPALIVE_INTERVAL};
