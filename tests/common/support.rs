#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::{Duration, Instant};

use prefsync::{
    AccessPolicy, ChangeListener, ClientConfig, EndpointConfig, LocalTransport, MemoryStore,
    RemoteStoreClient, StoreEndpoint,
};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

pub const NAMESPACE: &str = "settings";

static INIT_TRACING: Once = Once::new();

pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// One endpoint serving [`NAMESPACE`] from a [`MemoryStore`], reachable
/// through an in-process transport.
pub struct EndpointHarness {
    pub store: Arc<MemoryStore>,
    pub endpoint: Arc<StoreEndpoint>,
    pub transport: LocalTransport,
}

impl EndpointHarness {
    pub fn new() -> Self {
        Self::build(EndpointConfig::new())
    }

    pub fn with_policy<P>(policy: P) -> Self
    where
        P: AccessPolicy + 'static,
    {
        Self::build(EndpointConfig::new().with_access_policy(policy))
    }

    fn build(config: EndpointConfig) -> Self {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let endpoint = StoreEndpoint::new(config.with_namespace(NAMESPACE, store.clone()))
            .expect("endpoint config is valid");
        let endpoint = Arc::new(endpoint);
        let transport = LocalTransport::new(Arc::clone(&endpoint));
        Self {
            store,
            endpoint,
            transport,
        }
    }

    pub fn client(&self) -> RemoteStoreClient {
        self.client_with(ClientConfig::new(NAMESPACE))
    }

    pub fn strict_client(&self) -> RemoteStoreClient {
        self.client_with(ClientConfig::new(NAMESPACE).strict())
    }

    pub fn client_with(&self, config: ClientConfig) -> RemoteStoreClient {
        RemoteStoreClient::new(Arc::new(self.transport.clone()), config)
            .expect("client config is valid")
    }
}

/// Listener that records every key it is invoked with.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Option<String>>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Option<String>> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn wait_for(&self, count: usize) -> Vec<Option<String>> {
        assert!(
            wait_until(DEFAULT_TIMEOUT, || self.len() >= count),
            "expected {count} notifications, got {:?}",
            self.events()
        );
        self.events()
    }
}

impl ChangeListener for RecordingListener {
    fn on_change(&self, key: Option<&str>) {
        self.events.lock().unwrap().push(key.map(str::to_string));
    }
}
