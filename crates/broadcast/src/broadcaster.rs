//! Subscriber registry and fan-out implementation

use crate::{DeliveryFailure, PushMessage, Subscriber};
use sample_store::Sample;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Opaque subscriber identity, returned by `subscribe`.
pub type SubscriberId = Uuid;

/// Fan-out hub for drowsiness updates.
///
/// The subscriber set is mutated only through `subscribe`/`unsubscribe`
/// (and internally when a push fails).
pub struct Broadcaster {
    subscribers: Mutex<HashMap<SubscriberId, Box<dyn Subscriber>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a subscriber and immediately push the provided recent-history
    /// snapshot, so every new subscriber starts with context rather than an
    /// empty view. An empty snapshot is skipped, matching the ingest wire
    /// contract (no history message before any data exists).
    ///
    /// Registration happens before the history push and both run under the
    /// registry lock, so no fanout can slip between them; a failed push
    /// takes the same removal path as a failed fanout.
    pub fn subscribe(&self, handle: Box<dyn Subscriber>, history: Vec<Sample>) -> SubscriberId {
        let id = Uuid::new_v4();

        let mut subscribers = lock(&self.subscribers);
        subscribers.insert(id, handle);

        if !history.is_empty() {
            // The handle is present; the entry lookup cannot miss.
            let failed = subscribers
                .get(&id)
                .map(|handle| handle.push(&PushMessage::History(history)).is_err())
                .unwrap_or(true);
            if failed {
                subscribers.remove(&id);
                warn!(subscriber = %id, "history push failed, subscriber removed");
                return id;
            }
        }

        info!(subscriber = %id, total = subscribers.len(), "subscriber registered");
        id
    }

    /// Remove a subscriber. Idempotent; unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = lock(&self.subscribers);
        if subscribers.remove(&id).is_some() {
            info!(subscriber = %id, total = subscribers.len(), "subscriber removed");
        }
    }

    /// Push one new sample to every registered subscriber.
    ///
    /// Best-effort: a failed push removes that subscriber and never affects
    /// delivery to the others or propagates to the caller.
    pub fn fanout(&self, sample: &Sample) {
        let message = PushMessage::Data(sample.clone());
        let mut subscribers = lock(&self.subscribers);

        let failed: Vec<SubscriberId> = subscribers
            .iter()
            .filter_map(|(id, handle)| match handle.push(&message) {
                Ok(()) => None,
                Err(e) => {
                    warn!(subscriber = %id, "push failed, removing subscriber: {}", e);
                    Some(*id)
                }
            })
            .collect();

        for id in failed {
            subscribers.remove(&id);
        }

        debug!(delivered = subscribers.len(), "sample fanned out");
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

// A poisoned registry lock only means a panic mid-push; the map itself is
// still coherent, so recover the guard rather than spreading the panic.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Channel-backed subscriber used by the WebSocket transport and tests.
///
/// `push` enqueues without waiting, so a slow connection cannot stall the
/// fan-out path; the transport side drains the receiver at its own pace.
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<PushMessage>,
}

impl ChannelSubscriber {
    pub fn new(tx: mpsc::UnboundedSender<PushMessage>) -> Self {
        Self { tx }
    }
}

impl Subscriber for ChannelSubscriber {
    fn push(&self, message: &PushMessage) -> Result<(), DeliveryFailure> {
        self.tx
            .send(message.clone())
            .map_err(|_| DeliveryFailure::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample(secs: i64) -> Sample {
        Sample::new(false, Utc.timestamp_opt(secs, 0).unwrap())
    }

    /// Counts pushes; optionally fails every push.
    struct CountingSubscriber {
        pushes: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Subscriber for CountingSubscriber {
        fn push(&self, _message: &PushMessage) -> Result<(), DeliveryFailure> {
            if self.fail {
                return Err(DeliveryFailure::ChannelClosed);
            }
            self.pushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting(fail: bool) -> (Box<CountingSubscriber>, Arc<AtomicUsize>) {
        let pushes = Arc::new(AtomicUsize::new(0));
        (
            Box::new(CountingSubscriber {
                pushes: pushes.clone(),
                fail,
            }),
            pushes,
        )
    }

    #[test]
    fn test_subscribe_pushes_history() {
        let broadcaster = Broadcaster::new();
        let (sub, pushes) = counting(false);

        broadcaster.subscribe(sub, vec![sample(0), sample(1)]);
        assert_eq!(pushes.load(Ordering::SeqCst), 1);
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_subscribe_skips_empty_history() {
        let broadcaster = Broadcaster::new();
        let (sub, pushes) = counting(false);

        broadcaster.subscribe(sub, vec![]);
        assert_eq!(pushes.load(Ordering::SeqCst), 0);
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_failed_history_push_takes_removal_path() {
        let broadcaster = Broadcaster::new();
        let (bad, _) = counting(true);

        let id = broadcaster.subscribe(bad, vec![sample(0)]);
        // The handle never became observable as a live subscriber.
        assert_eq!(broadcaster.subscriber_count(), 0);
        broadcaster.unsubscribe(id); // still idempotent
    }

    #[test]
    fn test_failed_subscriber_isolated() {
        let broadcaster = Broadcaster::new();
        let (ok1, pushes1) = counting(false);
        let (bad, _) = counting(true);
        let (ok2, pushes2) = counting(false);

        broadcaster.subscribe(ok1, vec![]);
        broadcaster.subscribe(bad, vec![]);
        broadcaster.subscribe(ok2, vec![]);
        assert_eq!(broadcaster.subscriber_count(), 3);

        broadcaster.fanout(&sample(0));

        // Healthy subscribers got the sample; the failing one was removed.
        assert_eq!(pushes1.load(Ordering::SeqCst), 1);
        assert_eq!(pushes2.load(Ordering::SeqCst), 1);
        assert_eq!(broadcaster.subscriber_count(), 2);
    }

    #[test]
    fn test_unsubscribe_idempotent() {
        let broadcaster = Broadcaster::new();
        let (sub, _) = counting(false);
        let id = broadcaster.subscribe(sub, vec![]);

        broadcaster.unsubscribe(id);
        broadcaster.unsubscribe(id);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_channel_subscriber_delivery() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let broadcaster = Broadcaster::new();
        broadcaster.subscribe(Box::new(ChannelSubscriber::new(tx)), vec![sample(0)]);
        broadcaster.fanout(&sample(1));

        assert!(matches!(rx.try_recv(), Ok(PushMessage::History(h)) if h.len() == 1));
        assert!(matches!(rx.try_recv(), Ok(PushMessage::Data(_))));
    }

    #[test]
    fn test_closed_channel_removed_on_fanout() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let broadcaster = Broadcaster::new();
        broadcaster.subscribe(Box::new(ChannelSubscriber::new(tx)), vec![]);
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.fanout(&sample(0));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
