use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::StoreResult;
use crate::types::Value;

use super::{apply_mutations, KeyValueStore, Mutation, StoreObserver};

/// In-process [`KeyValueStore`] backed by a sorted map.
///
/// Commits are applied under a single write lock, so readers observe either
/// the whole batch or none of it.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
    observers: RwLock<Vec<StoreObserver>>,
    fail_commits: AtomicBool,
    commits: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let store = Self::new();
        {
            let mut map = store.entries.write();
            for (key, value) in entries {
                if !value.is_null() {
                    map.insert(key.into(), value);
                }
            }
        }
        store
    }

    /// Makes every following commit report failure without applying anything.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::Release);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn get_all(&self) -> StoreResult<BTreeMap<String, Value>> {
        Ok(self.entries.read().clone())
    }

    fn commit(&self, mutations: &[Mutation]) -> StoreResult<bool> {
        if self.fail_commits.load(Ordering::Acquire) {
            tracing::debug!(mutations = mutations.len(), "memory store refusing commit");
            return Ok(false);
        }

        let changes = {
            let mut entries = self.entries.write();
            apply_mutations(&mut entries, mutations)
        };
        self.commits.fetch_add(1, Ordering::AcqRel);

        if !changes.is_empty() {
            let observers = self.observers.read().clone();
            for observer in &observers {
                changes.notify(observer);
            }
        }
        Ok(true)
    }

    fn on_change(&self, observer: StoreObserver) {
        self.observers.write().push(observer);
    }
}
