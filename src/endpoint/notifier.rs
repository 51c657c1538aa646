use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

use parking_lot::RwLock;

use crate::types::ChangeEvent;

pub type SubscriberId = u64;

/// Non-blocking destination for change events.
///
/// `deliver` returns `false` once the receiving side is gone; the notifier
/// then drops the subscription.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &ChangeEvent) -> bool;
}

impl EventSink for mpsc::Sender<ChangeEvent> {
    fn deliver(&self, event: &ChangeEvent) -> bool {
        self.send(event.clone()).is_ok()
    }
}

impl EventSink for tokio::sync::mpsc::UnboundedSender<ChangeEvent> {
    fn deliver(&self, event: &ChangeEvent) -> bool {
        self.send(event.clone()).is_ok()
    }
}

/// Adapts a closure into an [`EventSink`].
pub struct CallbackSink<F>(pub F);

impl<F> EventSink for CallbackSink<F>
where
    F: Fn(&ChangeEvent) -> bool + Send + Sync,
{
    fn deliver(&self, event: &ChangeEvent) -> bool {
        (self.0)(event)
    }
}

struct Subscriber {
    namespace: Option<String>,
    sink: Box<dyn EventSink>,
}

impl Subscriber {
    fn wants(&self, event: &ChangeEvent) -> bool {
        self.namespace
            .as_deref()
            .map_or(true, |namespace| namespace == event.namespace)
    }
}

/// Registry fanning change events out to subscribers.
///
/// Publishing never blocks on a subscriber: sinks only enqueue, delivery to
/// listeners happens on the subscriber's own context.
#[derive(Default)]
pub struct ChangeNotifier {
    next_id: AtomicU64,
    subscribers: RwLock<BTreeMap<SubscriberId, Subscriber>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sink` for events of `namespace`, or of every namespace when
    /// `None`.
    pub fn subscribe(&self, namespace: Option<String>, sink: Box<dyn EventSink>) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.subscribers
            .write()
            .insert(id, Subscriber { namespace, sink });
        tracing::debug!(subscriber = id, "change subscriber registered");
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.write().remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = id, "change subscriber removed");
        }
        removed
    }

    pub fn publish(&self, event: ChangeEvent) {
        let mut closed = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for (id, subscriber) in subscribers.iter() {
                if subscriber.wants(&event) && !subscriber.sink.deliver(&event) {
                    closed.push(*id);
                }
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in closed {
                subscribers.remove(&id);
                tracing::debug!(subscriber = id, "pruned closed change subscriber");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
