//! Client side of the protocol.
//!
//! A [`RemoteStoreClient`] reads and writes one namespace of a remote
//! [`StoreEndpoint`](crate::endpoint::StoreEndpoint) through a [`Transport`]
//! and reconstructs typed values from wire rows.
//!
//! Failures fall into two groups. Type mismatches and invalid keys are
//! programming errors and always surface. Failed round trips (unreachable or
//! disabled endpoint, refused request) surface as
//! [`ClientError::RemoteAccess`] in strict mode; in lenient mode the call
//! returns the caller's default, an empty map or `false` instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::address::Address;
use crate::codec;
use crate::error::StoreError;
use crate::types::{Columns, StringSet, TypeTag, Value};

mod editor;
mod listeners;
pub mod transport;

pub use editor::Editor;
pub use listeners::{ChangeListener, ListenerId};
pub use transport::{LocalTransport, Subscription, Transport, TransportError};

use listeners::ListenerRegistry;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub namespace: String,
    /// Turns failed round trips into errors instead of defaults.
    pub strict: bool,
    /// Name of the listener dispatch thread.
    pub dispatcher_name: Option<String>,
}

impl ClientConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            strict: false,
            dispatcher_name: None,
        }
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_dispatcher_name(mut self, name: impl Into<String>) -> Self {
        self.dispatcher_name = Some(name.into());
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("remote access to namespace {namespace} failed: {source}")]
    RemoteAccess {
        namespace: String,
        #[source]
        source: TransportError,
    },
    #[error("key {key} holds a {found} value, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: TypeTag,
        found: TypeTag,
    },
    #[error("invalid key {key:?}: {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("invalid namespace: {0}")]
    InvalidNamespace(#[source] StoreError),
    #[error("endpoint returned an unreadable row: {0}")]
    InvalidRow(#[source] StoreError),
    #[error("failed to start listener dispatcher: {0}")]
    Dispatcher(#[source] std::io::Error),
}

/// Typed view over one remote namespace.
pub struct RemoteStoreClient {
    transport: Arc<dyn Transport>,
    namespace: String,
    strict: bool,
    listeners: ListenerRegistry,
}

impl RemoteStoreClient {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Result<Self, ClientError> {
        let ClientConfig {
            namespace,
            strict,
            dispatcher_name,
        } = config;

        Address::namespace(namespace.as_str()).map_err(ClientError::InvalidNamespace)?;
        let thread_name = dispatcher_name.unwrap_or_else(|| format!("prefsync-listeners-{namespace}"));

        Ok(Self {
            transport,
            listeners: ListenerRegistry::new(namespace.clone(), thread_name),
            namespace,
            strict,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn get_string(&self, key: &str, default: &str) -> Result<String, ClientError> {
        Ok(self
            .fetch(key, TypeTag::String)?
            .and_then(Value::into_string)
            .unwrap_or_else(|| default.to_string()))
    }

    pub fn get_string_set(&self, key: &str, default: StringSet) -> Result<StringSet, ClientError> {
        Ok(self
            .fetch(key, TypeTag::StringSet)?
            .and_then(Value::into_string_set)
            .unwrap_or(default))
    }

    pub fn get_int(&self, key: &str, default: i32) -> Result<i32, ClientError> {
        Ok(self
            .fetch(key, TypeTag::Int)?
            .and_then(|value| value.as_int())
            .unwrap_or(default))
    }

    pub fn get_long(&self, key: &str, default: i64) -> Result<i64, ClientError> {
        Ok(self
            .fetch(key, TypeTag::Long)?
            .and_then(|value| value.as_long())
            .unwrap_or(default))
    }

    pub fn get_float(&self, key: &str, default: f32) -> Result<f32, ClientError> {
        Ok(self
            .fetch(key, TypeTag::Float)?
            .and_then(|value| value.as_float())
            .unwrap_or(default))
    }

    pub fn get_boolean(&self, key: &str, default: bool) -> Result<bool, ClientError> {
        Ok(self
            .fetch(key, TypeTag::Boolean)?
            .and_then(|value| value.as_bool())
            .unwrap_or(default))
    }

    /// Reads `key` expecting a value of type `expected`.
    ///
    /// Returns `default` when the key is absent, or when the round trip fails
    /// in lenient mode. A stored value of another type is always an error.
    pub fn get_typed(
        &self,
        key: &str,
        default: Value,
        expected: TypeTag,
    ) -> Result<Value, ClientError> {
        Ok(self.fetch(key, expected)?.unwrap_or(default))
    }

    pub fn get_all(&self) -> Result<BTreeMap<String, Value>, ClientError> {
        let address = self.namespace_address()?;
        let rows = match self.transport.read(&address, Columns::all()) {
            Ok(rows) => rows,
            Err(source) => return self.degrade(source, BTreeMap::new()),
        };

        let mut entries = BTreeMap::new();
        for row in rows {
            if row.tag == TypeTag::Null {
                continue;
            }
            let key = row.key.ok_or_else(|| {
                ClientError::InvalidRow(StoreError::invalid_value("row without a key"))
            })?;
            let value = codec::decode(row.tag, row.value).map_err(ClientError::InvalidRow)?;
            entries.insert(key, value);
        }
        Ok(entries)
    }

    /// Only the type column is requested.
    pub fn contains(&self, key: &str) -> Result<bool, ClientError> {
        let address = self.entry_address(key)?;
        match self.transport.read(&address, Columns::type_only()) {
            Ok(rows) => Ok(rows.iter().any(|row| row.tag != TypeTag::Null)),
            Err(source) => self.degrade(source, false),
        }
    }

    pub fn edit(&self) -> Editor<'_> {
        Editor::new(self)
    }

    /// Starts delivering change notifications for this namespace to
    /// `listener`. Registering the same `Arc` twice is a no-op.
    ///
    /// The registration lasts until [`unregister_listener`] is called; use
    /// [`listen`] for a scoped registration.
    ///
    /// [`unregister_listener`]: RemoteStoreClient::unregister_listener
    /// [`listen`]: RemoteStoreClient::listen
    pub fn register_listener(
        &self,
        listener: Arc<dyn ChangeListener>,
    ) -> Result<ListenerId, ClientError> {
        self.listeners
            .register(self.transport.as_ref(), self.strict, listener)
    }

    pub fn unregister_listener(&self, listener: &Arc<dyn ChangeListener>) -> bool {
        self.listeners.unregister(listener)
    }

    pub fn unregister_listener_id(&self, id: ListenerId) -> bool {
        self.listeners.unregister_id(id)
    }

    /// Registers `listener` until the returned guard is dropped.
    pub fn listen(&self, listener: Arc<dyn ChangeListener>) -> Result<ListenerGuard<'_>, ClientError> {
        let id = self.register_listener(listener)?;
        Ok(ListenerGuard { client: self, id })
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether the dispatcher thread is currently subscribed to the endpoint.
    pub fn is_dispatching(&self) -> bool {
        self.listeners.is_dispatching()
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn namespace_address(&self) -> Result<Address, ClientError> {
        Address::namespace(self.namespace.as_str()).map_err(ClientError::InvalidNamespace)
    }

    fn entry_address(&self, key: &str) -> Result<Address, ClientError> {
        Address::entry(self.namespace.as_str(), key).map_err(|source| ClientError::InvalidKey {
            key: key.to_string(),
            source,
        })
    }

    /// `Ok(None)` means "use the caller's default".
    fn fetch(&self, key: &str, expected: TypeTag) -> Result<Option<Value>, ClientError> {
        let address = self.entry_address(key)?;
        let rows = match self.transport.read(&address, Columns::type_and_value()) {
            Ok(rows) => rows,
            Err(source) => return self.degrade(source, None),
        };

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        if row.tag == TypeTag::Null {
            return Ok(None);
        }
        if row.tag != expected {
            return Err(ClientError::TypeMismatch {
                key: key.to_string(),
                expected,
                found: row.tag,
            });
        }
        codec::decode(row.tag, row.value)
            .map(Some)
            .map_err(ClientError::InvalidRow)
    }

    pub(crate) fn degrade<T>(&self, source: TransportError, fallback: T) -> Result<T, ClientError> {
        if self.strict {
            return Err(ClientError::RemoteAccess {
                namespace: self.namespace.clone(),
                source,
            });
        }
        tracing::debug!(
            namespace = %self.namespace,
            error = %source,
            "remote access failed, using fallback"
        );
        Ok(fallback)
    }
}

/// Scoped listener registration, released on drop.
#[must_use = "the listener is unregistered when the guard is dropped"]
pub struct ListenerGuard<'a> {
    client: &'a RemoteStoreClient,
    id: ListenerId,
}

impl ListenerGuard<'_> {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for ListenerGuard<'_> {
    fn drop(&mut self) {
        self.client.unregister_listener_id(self.id);
    }
}
