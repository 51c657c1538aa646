use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::endpoint::EventSink;
use crate::types::ChangeEvent;

use super::transport::{Subscription, Transport};
use super::ClientError;

pub type ListenerId = u64;

/// Receives change notifications for a client's namespace.
///
/// `key` is `None` when the whole namespace was cleared.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, key: Option<&str>);
}

impl<F> ChangeListener for F
where
    F: Fn(Option<&str>) + Send + Sync,
{
    fn on_change(&self, key: Option<&str>) {
        self(key)
    }
}

struct Registered {
    id: ListenerId,
    /// First event sequence number this listener may observe.
    since: u64,
    listener: Arc<dyn ChangeListener>,
}

type SharedListeners = Arc<Mutex<Vec<Registered>>>;

enum Message {
    Event { seq: u64, event: ChangeEvent },
    Stop,
}

/// Stamps every event with a client-wide sequence number on arrival.
struct DispatchSink {
    tx: mpsc::Sender<Message>,
    sequence: Arc<AtomicU64>,
}

impl EventSink for DispatchSink {
    fn deliver(&self, event: &ChangeEvent) -> bool {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.tx
            .send(Message::Event {
                seq,
                event: event.clone(),
            })
            .is_ok()
    }
}

struct Dispatcher {
    subscription: Option<Subscription>,
    control: mpsc::Sender<Message>,
    thread: JoinHandle<()>,
}

impl Dispatcher {
    /// Cancels the subscription and waits for the thread to drain, unless
    /// called from the dispatcher thread itself.
    fn stop(self) {
        if let Some(subscription) = self.subscription {
            subscription.cancel();
        }
        let _ = self.control.send(Message::Stop);
        if self.thread.thread().id() == thread::current().id() {
            return;
        }
        if self.thread.join().is_err() {
            tracing::warn!("change dispatcher panicked");
        }
    }
}

/// Explicit listener registry with one dispatcher thread per client.
///
/// The dispatcher and its endpoint subscription exist only while at least one
/// listener is registered. At most one dispatcher runs at a time, and a
/// listener never sees events that arrived before it was registered.
pub(crate) struct ListenerRegistry {
    namespace: String,
    thread_name: String,
    next_id: AtomicU64,
    sequence: Arc<AtomicU64>,
    listeners: SharedListeners,
    active: Mutex<Option<Dispatcher>>,
}

impl ListenerRegistry {
    pub(crate) fn new(namespace: String, thread_name: String) -> Self {
        Self {
            namespace,
            thread_name,
            next_id: AtomicU64::new(0),
            sequence: Arc::new(AtomicU64::new(0)),
            listeners: Arc::new(Mutex::new(Vec::new())),
            active: Mutex::new(None),
        }
    }

    /// Registers `listener`; re-registering the same `Arc` returns its
    /// existing id.
    ///
    /// `strict` decides whether a failed endpoint subscription is an error or
    /// only leaves the listener registered locally.
    pub(crate) fn register(
        &self,
        transport: &dyn Transport,
        strict: bool,
        listener: Arc<dyn ChangeListener>,
    ) -> Result<ListenerId, ClientError> {
        let mut active = self.active.lock();

        if let Some(id) = self.find(&listener) {
            return Ok(id);
        }

        let since = self.sequence.load(Ordering::SeqCst);
        if active.is_none() {
            match self.start_dispatcher(transport) {
                Ok(dispatcher) => *active = Some(dispatcher),
                Err(ClientError::RemoteAccess { source, .. }) if !strict => {
                    tracing::debug!(
                        namespace = %self.namespace,
                        error = %source,
                        "change subscription unavailable, listener registered locally"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.listeners.lock().push(Registered {
            id,
            since,
            listener,
        });
        Ok(id)
    }

    pub(crate) fn unregister(&self, listener: &Arc<dyn ChangeListener>) -> bool {
        self.remove_where(|registered| same_listener(&registered.listener, listener))
    }

    pub(crate) fn unregister_id(&self, id: ListenerId) -> bool {
        self.remove_where(|registered| registered.id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub(crate) fn is_dispatching(&self) -> bool {
        self.active.lock().is_some()
    }

    fn find(&self, listener: &Arc<dyn ChangeListener>) -> Option<ListenerId> {
        self.listeners
            .lock()
            .iter()
            .find(|registered| same_listener(&registered.listener, listener))
            .map(|registered| registered.id)
    }

    fn remove_where(&self, matches: impl Fn(&Registered) -> bool) -> bool {
        let mut active = self.active.lock();
        let now_empty = {
            let mut listeners = self.listeners.lock();
            let before = listeners.len();
            listeners.retain(|registered| !matches(registered));
            if listeners.len() == before {
                return false;
            }
            listeners.is_empty()
        };

        if now_empty {
            if let Some(dispatcher) = active.take() {
                dispatcher.stop();
                tracing::debug!(namespace = %self.namespace, "change dispatcher stopped");
            }
        }
        true
    }

    fn start_dispatcher(&self, transport: &dyn Transport) -> Result<Dispatcher, ClientError> {
        let (tx, rx) = mpsc::channel::<Message>();
        let namespace = self.namespace.clone();
        let listeners = Arc::clone(&self.listeners);

        let thread = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || dispatch(rx, &namespace, &listeners))
            .map_err(ClientError::Dispatcher)?;

        let mut dispatcher = Dispatcher {
            subscription: None,
            control: tx.clone(),
            thread,
        };
        let sink = DispatchSink {
            tx,
            sequence: Arc::clone(&self.sequence),
        };
        match transport.subscribe(&self.namespace, Box::new(sink)) {
            Ok(subscription) => dispatcher.subscription = Some(subscription),
            Err(source) => {
                dispatcher.stop();
                return Err(ClientError::RemoteAccess {
                    namespace: self.namespace.clone(),
                    source,
                });
            }
        }

        tracing::debug!(
            namespace = %self.namespace,
            thread = %self.thread_name,
            "change dispatcher started"
        );
        Ok(dispatcher)
    }
}

impl Drop for ListenerRegistry {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.active.get_mut().take() {
            dispatcher.stop();
        }
    }
}

fn dispatch(messages: Receiver<Message>, namespace: &str, listeners: &SharedListeners) {
    for message in messages {
        let (seq, event) = match message {
            Message::Event { seq, event } => (seq, event),
            Message::Stop => break,
        };
        if event.namespace != namespace {
            continue;
        }
        let snapshot: Vec<Arc<dyn ChangeListener>> = listeners
            .lock()
            .iter()
            .filter(|registered| registered.since <= seq)
            .map(|registered| Arc::clone(&registered.listener))
            .collect();
        for listener in snapshot {
            listener.on_change(event.key.as_deref());
        }
    }
}

fn same_listener(a: &Arc<dyn ChangeListener>, b: &Arc<dyn ChangeListener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
