use crate::models::SessionEvent;

/// Outbound side of session notifications.
///
/// Publishing is fire-and-forget: implementations must not block and must
/// not fail. Nothing that happens here can undo a committed session change.
pub trait EventPublisher: Send + Sync {
    /// Fan `event` out, returning how many subscribers it reached.
    fn publish(&self, event: SessionEvent) -> usize;
}
