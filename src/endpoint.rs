//! Server side of the protocol.
//!
//! A [`StoreEndpoint`] exposes a fixed set of namespaces, each bound to an
//! external [`KeyValueStore`]. Every request is checked against the
//! configured [`AccessPolicy`]; writes run the access check, value decoding
//! and the store commit inside one per-namespace critical section, so a batch
//! is either applied whole or not at all.
//!
//! Change events come from the stores' native observers, which the endpoint
//! attaches at construction. Writes made through the endpoint and
//! out-of-band writes made directly on a store therefore produce the same
//! events, exactly once.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::address::Address;
use crate::codec;
use crate::error::{StoreError, StoreResult};
use crate::storage::{KeyValueStore, Mutation};
use crate::types::{ChangeEvent, Columns, TypeTag, Value, WireRow, WireValue};

pub mod access;
pub mod config;
pub mod notifier;

pub use access::{AccessPolicy, AllowAll, ReadOnly};
pub use config::{EndpointConfig, NamespaceBinding};
pub use notifier::{CallbackSink, ChangeNotifier, EventSink, SubscriberId};

struct Namespace {
    store: Arc<dyn KeyValueStore>,
    commit_lock: Mutex<()>,
}

/// A write row after its key has been resolved. `key == None` is a clear.
struct Target {
    key: Option<String>,
    row: WireRow,
}

pub struct StoreEndpoint {
    namespaces: BTreeMap<String, Namespace>,
    access: Arc<dyn AccessPolicy>,
    notifier: Arc<ChangeNotifier>,
}

impl StoreEndpoint {
    pub fn new(config: EndpointConfig) -> StoreResult<Self> {
        config.validate()?;

        let notifier = Arc::new(ChangeNotifier::new());
        let mut namespaces = BTreeMap::new();
        for binding in config.namespaces {
            attach_observer(&binding.name, binding.store.as_ref(), &notifier);
            namespaces.insert(
                binding.name,
                Namespace {
                    store: binding.store,
                    commit_lock: Mutex::new(()),
                },
            );
        }

        tracing::info!(
            namespaces = namespaces.len(),
            "store endpoint ready"
        );

        Ok(Self {
            namespaces,
            access: config.access,
            notifier,
        })
    }

    /// Names of the exposed namespaces, sorted.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Returns zero or one row for a keyed address, one row per entry for a
    /// namespace address. The type column is always populated.
    pub fn read(&self, address: &Address, columns: Columns) -> StoreResult<Vec<WireRow>> {
        let name = address.namespace_name();
        self.check_access(name, address.access_key(), false)?;
        let namespace = self.namespace(name)?;

        let rows = match address.key() {
            Some(key) => namespace
                .store
                .get(key)?
                .map(|value| project(key, &value, columns))
                .into_iter()
                .collect(),
            None => namespace
                .store
                .get_all()?
                .iter()
                .map(|(key, value)| project(key, value, columns))
                .collect(),
        };
        Ok(rows)
    }

    /// Applies `rows` to the addressed namespace as a single batch and
    /// returns the number of rows written.
    pub fn write(&self, address: &Address, rows: Vec<WireRow>) -> StoreResult<usize> {
        let count = rows.len();
        self.apply(address, rows)?;
        Ok(count)
    }

    /// Writes one row and returns the address of the entry it touched.
    pub fn insert(&self, address: &Address, row: WireRow) -> StoreResult<Address> {
        let keys = self.apply(address, vec![row])?;
        match keys.into_iter().next().flatten() {
            Some(key) => Address::entry(address.namespace_name(), key),
            None => Ok(address.parent()),
        }
    }

    /// `None` deletes the addressed entry (or clears the namespace).
    pub fn update(&self, address: &Address, row: Option<WireRow>) -> StoreResult<()> {
        match row {
            Some(row) => self.apply(address, vec![row]).map(|_| ()),
            None => self.delete(address),
        }
    }

    /// Removes the addressed key, or clears the namespace.
    pub fn delete(&self, address: &Address) -> StoreResult<()> {
        let name = address.namespace_name();
        let namespace = self.namespace(name)?;
        let mutation = match address.key() {
            Some(key) => Mutation::remove(key),
            None => Mutation::Clear,
        };

        let _guard = namespace.commit_lock.lock();
        self.check_access(name, address.access_key(), true)?;
        commit(name, namespace, &[mutation])
    }

    /// Subscribes `sink` to one namespace, or to all of them with `None`.
    pub fn subscribe(
        &self,
        namespace: Option<&str>,
        sink: Box<dyn EventSink>,
    ) -> StoreResult<SubscriberId> {
        if let Some(name) = namespace {
            self.namespace(name)?;
        }
        Ok(self.notifier.subscribe(namespace.map(str::to_string), sink))
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.notifier.unsubscribe(id)
    }

    fn apply(&self, address: &Address, rows: Vec<WireRow>) -> StoreResult<Vec<Option<String>>> {
        let targets = resolve_targets(address, rows).map_err(|err| {
            tracing::debug!(address = %address, error = %err, "rejected write payload");
            err
        })?;
        let name = address.namespace_name();
        let namespace = self.namespace(name)?;
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = namespace.commit_lock.lock();
        for target in &targets {
            self.check_access(name, target.key.as_deref().unwrap_or(""), true)?;
        }

        let mut mutations = Vec::with_capacity(targets.len());
        let mut keys = Vec::with_capacity(targets.len());
        for Target { key, row } in targets {
            let mutation = match (&key, codec::decode(row.tag, row.value)?) {
                (None, _) => Mutation::Clear,
                (Some(key), Value::Null) => Mutation::remove(key.as_str()),
                (Some(key), value) => Mutation::put(key.as_str(), value),
            };
            mutations.push(mutation);
            keys.push(key);
        }

        commit(name, namespace, &mutations)?;
        Ok(keys)
    }

    fn namespace(&self, name: &str) -> StoreResult<&Namespace> {
        self.namespaces
            .get(name)
            .ok_or_else(|| StoreError::UnknownNamespace {
                namespace: name.to_string(),
            })
    }

    fn check_access(&self, namespace: &str, key: &str, is_write: bool) -> StoreResult<()> {
        if self.access.allow(namespace, key, is_write) {
            return Ok(());
        }
        tracing::warn!(namespace, key, is_write, "access denied");
        Err(StoreError::AccessDenied {
            namespace: namespace.to_string(),
            key: key.to_string(),
        })
    }
}

fn attach_observer(name: &str, store: &dyn KeyValueStore, notifier: &Arc<ChangeNotifier>) {
    let namespace = name.to_string();
    let notifier: Weak<ChangeNotifier> = Arc::downgrade(notifier);
    store.on_change(Arc::new(move |key: Option<&str>| {
        if let Some(notifier) = notifier.upgrade() {
            notifier.publish(ChangeEvent {
                namespace: namespace.clone(),
                key: key.map(str::to_string),
            });
        }
    }));
}

fn commit(name: &str, namespace: &Namespace, mutations: &[Mutation]) -> StoreResult<()> {
    match namespace.store.commit(mutations) {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::error!(namespace = name, mutations = mutations.len(), "store refused commit");
            Err(StoreError::CommitRejected {
                namespace: name.to_string(),
            })
        }
        Err(err) => {
            tracing::error!(namespace = name, error = %err, "store commit failed");
            Err(err)
        }
    }
}

fn project(key: &str, value: &Value, columns: Columns) -> WireRow {
    let (tag, raw) = codec::encode(value);
    WireRow {
        key: columns.key.then(|| key.to_string()),
        tag,
        value: if columns.value { raw } else { WireValue::Null },
    }
}

/// Pairs every row with the key it targets.
///
/// A keyed address takes exactly one row whose own key, when present, must
/// agree with it. At namespace scope every row names its key, except a
/// single `Null` row meaning "clear", which must precede all additions.
fn resolve_targets(address: &Address, mut rows: Vec<WireRow>) -> StoreResult<Vec<Target>> {
    if let Some(address_key) = address.key() {
        if rows.len() != 1 {
            return Err(StoreError::invalid_value(format!(
                "address {address} expects exactly one row, got {}",
                rows.len()
            )));
        }
        let row = rows.remove(0);
        if let Some(row_key) = row.effective_key() {
            if row_key != address_key {
                return Err(StoreError::ConflictingKey {
                    address_key: address_key.to_string(),
                    row_key: row_key.to_string(),
                });
            }
        }
        return Ok(vec![Target {
            key: Some(address_key.to_string()),
            row,
        }]);
    }

    let mut cleared = false;
    let mut added = false;
    let mut targets = Vec::with_capacity(rows.len());
    for row in rows {
        let key = match row.effective_key() {
            Some(key) if key.contains('/') => {
                return Err(StoreError::invalid_value(format!(
                    "key `{key}` must not contain '/'"
                )));
            }
            Some(key) => {
                added |= row.tag != TypeTag::Null;
                Some(key.to_string())
            }
            None if row.tag == TypeTag::Null => {
                if cleared {
                    return Err(StoreError::invalid_value(
                        "a batch may clear the namespace only once",
                    ));
                }
                if added {
                    return Err(StoreError::invalid_value(
                        "namespace clear must precede every addition in the batch",
                    ));
                }
                cleared = true;
                None
            }
            None => {
                return Err(StoreError::invalid_value(format!(
                    "{} row without a key at namespace scope",
                    row.tag
                )));
            }
        };
        targets.push(Target { key, row });
    }
    Ok(targets)
}
