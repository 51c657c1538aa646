//! # Prefsync
//!
//! Expose namespaced key-value preferences from one process to others, with
//! typed reads, batched writes and change notifications.
//!
//! ## Pieces
//!
//! - **[`StoreEndpoint`]**: wraps one or more [`KeyValueStore`] namespaces,
//!   enforces an [`AccessPolicy`] and publishes [`ChangeEvent`]s.
//! - **[`RemoteStoreClient`]**: typed getters, an [`Editor`] for batched
//!   writes and change listeners, over any [`Transport`].
//! - **[`net`]**: a TCP/TLS server for an endpoint and the matching
//!   [`NetworkTransport`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use prefsync::*;
//!
//! let store = Arc::new(MemoryStore::new());
//! let endpoint = StoreEndpoint::new(EndpointConfig::new().with_namespace("settings", store))?;
//! let transport = Arc::new(LocalTransport::new(Arc::new(endpoint)));
//!
//! let client = RemoteStoreClient::new(transport, ClientConfig::new("settings"))?;
//! client.edit().put_string("theme", "dark").put_int("volume", 7).commit()?;
//! assert_eq!(client.get_int("volume", 0)?, 7);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Clients are lenient by default: a failed round trip yields the supplied
//! default. `ClientConfig::strict()` turns those failures into
//! [`ClientError::RemoteAccess`]. Type mismatches are reported either way.
//!
//! The network server refuses to start with the placeholder Basic Auth
//! credentials; set real ones through `RemoteServerConfig::with_basic_auth`.

pub mod api;
pub mod client;
pub mod endpoint;
pub mod net;
pub mod storage;

pub use crate::api::{address, codec, error, types};

pub use api::address::Address;
pub use api::error::{ErrorCode, StoreError, StoreResult};
pub use api::types::*;
pub use client::{
    ChangeListener, ClientConfig, ClientError, Editor, ListenerGuard, ListenerId, LocalTransport,
    RemoteStoreClient, Subscription, Transport, TransportError,
};
pub use endpoint::{
    AccessPolicy, AllowAll, CallbackSink, ChangeNotifier, EndpointConfig, EventSink, ReadOnly,
    StoreEndpoint, SubscriberId,
};
pub use net::{
    BasicAuthConfig, NetworkConfig, NetworkSecurity, NetworkTransport, RemoteEndpointServer,
    RemoteServerConfig, RemoteServerHandle, RemoteServerSecurity, ServerError, ServerHandle,
    ServerMetricsSnapshot,
};
pub use storage::{KeyValueStore, MemoryStore, Mutation, StoreObserver};
