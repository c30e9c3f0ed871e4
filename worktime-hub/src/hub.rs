use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace};
use worktime_core::{
    models::{SessionEvent, UserId},
    service::EventPublisher,
};

/// Pending events a mailbox holds before new ones are dropped
pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// Handle for one subscribed connection
pub type ConnectionId = String;

type Mailbox = mpsc::Sender<SessionEvent>;

/// Which subscriber set a mailbox belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Events concerning one user
    User(UserId),
    /// Every event
    Admin,
}

#[derive(Default)]
struct Subscribers {
    users: HashMap<UserId, HashMap<ConnectionId, Mailbox>>,
    admins: HashMap<ConnectionId, Mailbox>,
}

struct HubInner {
    subscribers: RwLock<Subscribers>,
    mailbox_capacity: usize,
}

/// In-process broker fanning session events out to connected streams.
///
/// Registration and removal take the write lock; publishing only the read
/// lock, so concurrent publishes never wait on each other. Delivery is a
/// non-blocking enqueue into each bounded mailbox; a full mailbox loses the
/// event and nothing else is affected.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    /// Create a hub whose mailboxes hold `mailbox_capacity` pending events
    #[must_use]
    pub fn new(mailbox_capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: RwLock::new(Subscribers::default()),
                mailbox_capacity: mailbox_capacity.max(1),
            }),
        }
    }

    /// Subscribe to events concerning `user_id`.
    ///
    /// A user may hold any number of subscriptions at once.
    #[must_use]
    pub fn subscribe_user(&self, user_id: UserId) -> Subscription {
        self.subscribe(Audience::User(user_id))
    }

    /// Subscribe to every event
    #[must_use]
    pub fn subscribe_admin(&self) -> Subscription {
        self.subscribe(Audience::Admin)
    }

    fn subscribe(&self, audience: Audience) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.mailbox_capacity);
        let connection_id: ConnectionId = nanoid::nanoid!(12);

        {
            let mut subscribers = self.inner.subscribers.write();
            match audience {
                Audience::User(user_id) => {
                    subscribers
                        .users
                        .entry(user_id)
                        .or_default()
                        .insert(connection_id.clone(), tx);
                }
                Audience::Admin => {
                    subscribers.admins.insert(connection_id.clone(), tx);
                }
            }
        }

        debug!(audience = ?audience, connection_id = %connection_id, "Mailbox subscribed");

        Subscription {
            hub: self.clone(),
            audience,
            connection_id,
            receiver: rx,
        }
    }

    /// Remove a mailbox.
    ///
    /// Dropping the last sender closes the mailbox, so its reader sees end of
    /// stream once anything already queued has been drained. An emptied
    /// per-user set is pruned. Returns `false` if the mailbox was already gone.
    pub fn unsubscribe(&self, audience: &Audience, connection_id: &str) -> bool {
        let removed = {
            let mut subscribers = self.inner.subscribers.write();
            match audience {
                Audience::User(user_id) => {
                    let removed = subscribers
                        .users
                        .get_mut(user_id)
                        .and_then(|set| set.remove(connection_id));
                    if subscribers.users.get(user_id).is_some_and(|set| set.is_empty()) {
                        subscribers.users.remove(user_id);
                    }
                    removed
                }
                Audience::Admin => subscribers.admins.remove(connection_id),
            }
        };

        if removed.is_some() {
            debug!(audience = ?audience, connection_id = %connection_id, "Mailbox unsubscribed");
            true
        } else {
            trace!(connection_id = %connection_id, "Mailbox already unsubscribed");
            false
        }
    }

    /// Deliver `event` to the target user's mailboxes (when the target is a
    /// valid id) and to every admin mailbox. Never blocks and never fails.
    ///
    /// Returns the number of mailboxes the event was enqueued in.
    pub fn broadcast(&self, event: &SessionEvent) -> usize {
        let subscribers = self.inner.subscribers.read();
        let user_id = event.user_id();

        let targets = subscribers
            .users
            .get(&user_id)
            .filter(|_| user_id.is_valid())
            .into_iter()
            .flat_map(|set| set.iter())
            .chain(subscribers.admins.iter());

        let mut delivered = 0;
        for (connection_id, mailbox) in targets {
            match mailbox.try_send(*event) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(
                        connection_id = %connection_id,
                        event_type = event.event_type(),
                        "Mailbox full, event dropped"
                    );
                }
                // Reader went away; its subscription guard removes the entry
                Err(TrySendError::Closed(_)) => {}
            }
        }

        trace!(
            user_id = %user_id,
            event_type = event.event_type(),
            delivered,
            "Event published"
        );

        delivered
    }

    /// Number of mailboxes subscribed to `user_id`
    #[must_use]
    pub fn subscriber_count(&self, user_id: UserId) -> usize {
        self.inner
            .subscribers
            .read()
            .users
            .get(&user_id)
            .map_or(0, |set| set.len())
    }

    /// Number of users with at least one mailbox
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.inner.subscribers.read().users.len()
    }

    /// Number of admin mailboxes
    #[must_use]
    pub fn admin_count(&self) -> usize {
        self.inner.subscribers.read().admins.len()
    }

    /// Total mailboxes across both sets
    #[must_use]
    pub fn connection_count(&self) -> usize {
        let subscribers = self.inner.subscribers.read();
        subscribers.admins.len() + subscribers.users.values().map(|set| set.len()).sum::<usize>()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_MAILBOX_CAPACITY)
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("mailbox_capacity", &self.inner.mailbox_capacity)
            .field("connections", &self.connection_count())
            .finish()
    }
}

impl EventPublisher for EventHub {
    fn publish(&self, event: SessionEvent) -> usize {
        self.broadcast(&event)
    }
}

/// A registered mailbox.
///
/// Dropping the subscription unsubscribes it, whichever way its owner exits.
pub struct Subscription {
    hub: EventHub,
    audience: Audience,
    connection_id: ConnectionId,
    receiver: mpsc::Receiver<SessionEvent>,
}

impl Subscription {
    /// Next event, or `None` once the mailbox has been unsubscribed and drained
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.receiver.recv().await
    }

    #[must_use]
    pub const fn audience(&self) -> &Audience {
        &self.audience
    }

    #[must_use]
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.audience, &self.connection_id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("audience", &self.audience)
            .field("connection_id", &self.connection_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;
    use worktime_core::models::{ProjectId, SessionId, SessionStarted};

    fn started(user: i64, project: i64) -> SessionEvent {
        SessionEvent::SessionStarted(SessionStarted {
            session_id: SessionId::new(1),
            user_id: UserId::new(user),
            project_id: ProjectId::new(project),
            start_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_user_and_admins_only() {
        let hub = EventHub::default();
        let mut alice_phone = hub.subscribe_user(UserId::new(1));
        let mut alice_laptop = hub.subscribe_user(UserId::new(1));
        let mut bob = hub.subscribe_user(UserId::new(2));
        let mut admin = hub.subscribe_admin();

        let delivered = hub.broadcast(&started(1, 7));
        assert_eq!(delivered, 3);

        assert_eq!(alice_phone.recv().await.unwrap().user_id(), UserId::new(1));
        assert_eq!(alice_laptop.recv().await.unwrap().user_id(), UserId::new(1));
        assert_eq!(admin.recv().await.unwrap().event_type(), "session_started");

        let received = tokio::time::timeout(Duration::from_millis(100), bob.recv()).await;
        assert!(received.is_err(), "Bob should not have received Alice's event");
    }

    #[tokio::test]
    async fn test_full_mailbox_drops_only_for_that_mailbox() {
        let hub = EventHub::new(2);
        let mut stalled = hub.subscribe_user(UserId::new(1));
        let mut admin = hub.subscribe_admin();

        assert_eq!(hub.broadcast(&started(1, 1)), 2);
        assert_eq!(hub.broadcast(&started(1, 2)), 2);
        // Drain admin, leave the user's mailbox full
        admin.recv().await.unwrap();
        admin.recv().await.unwrap();

        assert_eq!(hub.broadcast(&started(1, 3)), 1);

        let SessionEvent::SessionStarted(e) = admin.recv().await.unwrap() else {
            panic!("unexpected event kind");
        };
        assert_eq!(e.project_id, ProjectId::new(3));

        // The stalled mailbox keeps the first two, in order, and lost the third
        for expected in [1, 2] {
            let SessionEvent::SessionStarted(e) = stalled.recv().await.unwrap() else {
                panic!("unexpected event kind");
            };
            assert_eq!(e.project_id, ProjectId::new(expected));
        }
        let received = tokio::time::timeout(Duration::from_millis(50), stalled.recv()).await;
        assert!(received.is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_harmless() {
        let hub = EventHub::default();
        assert_eq!(hub.broadcast(&started(1, 1)), 0);
        assert_eq!(hub.user_count(), 0);
    }

    #[tokio::test]
    async fn test_publisher_seam_and_untargeted_events() {
        let hub = EventHub::default();
        let publisher: &dyn EventPublisher = &hub;
        let mut nobody = hub.subscribe_user(UserId::new(0));
        let mut admin = hub.subscribe_admin();

        // Admins still see an event without a valid target user
        assert_eq!(publisher.publish(started(0, 1)), 1);
        assert!(admin.recv().await.is_some());
        let received = tokio::time::timeout(Duration::from_millis(50), nobody.recv()).await;
        assert!(received.is_err());
    }

    #[tokio::test]
    async fn test_dropping_last_subscription_prunes_user() {
        let hub = EventHub::default();
        let first = hub.subscribe_user(UserId::new(5));
        let second = hub.subscribe_user(UserId::new(5));
        let admin = hub.subscribe_admin();
        assert_eq!(hub.subscriber_count(UserId::new(5)), 2);
        assert_eq!(hub.connection_count(), 3);

        drop(first);
        assert_eq!(hub.subscriber_count(UserId::new(5)), 1);
        assert_eq!(hub.user_count(), 1);

        drop(second);
        assert_eq!(hub.subscriber_count(UserId::new(5)), 0);
        assert_eq!(hub.user_count(), 0);

        drop(admin);
        assert_eq!(hub.admin_count(), 0);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_mailbox_after_drain() {
        let hub = EventHub::default();
        let mut sub = hub.subscribe_user(UserId::new(1));
        hub.broadcast(&started(1, 1));

        let audience = *sub.audience();
        let id = sub.connection_id().to_string();
        assert!(hub.unsubscribe(&audience, &id));
        assert!(!hub.unsubscribe(&audience, &id));

        // Already queued event is still readable, then end of stream
        assert!(sub.recv().await.is_some());
        assert!(sub.recv().await.is_none());

        // Nothing new arrives after removal
        assert_eq!(hub.broadcast(&started(1, 2)), 0);
    }

    #[tokio::test]
    async fn test_closed_reader_does_not_break_publish() {
        let hub = EventHub::default();
        let mut healthy = hub.subscribe_admin();

        // Simulate a reader that vanished without its guard running yet
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        hub.inner
            .subscribers
            .write()
            .users
            .entry(UserId::new(1))
            .or_default()
            .insert("ghost".to_string(), tx);

        assert_eq!(hub.broadcast(&started(1, 1)), 1);
        assert!(healthy.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_subscribe_and_publish() {
        let hub = EventHub::new(1024);
        let mut admin = hub.subscribe_admin();

        let mut handles = Vec::new();
        for user in 1..=16 {
            let hub = hub.clone();
            handles.push(tokio::spawn(async move {
                let _sub = hub.subscribe_user(UserId::new(user));
                for _ in 0..10 {
                    hub.broadcast(&started(user, 1));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(hub.user_count(), 0);
        let mut seen = 0;
        while let Ok(Some(_)) = tokio::time::timeout(Duration::from_millis(20), admin.recv()).await {
            seen += 1;
        }
        assert_eq!(seen, 160);
    }
}
