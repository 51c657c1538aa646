//! External key-value store collaborator.
//!
//! The endpoint binds every exposed namespace to one [`KeyValueStore`]
//! handle. Implementations own persistence; the endpoint never caches entries
//! beyond a single request.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StoreResult;
use crate::types::Value;

pub mod memory;

pub use memory::MemoryStore;

/// Callback fired after a commit becomes visible. `None` means the whole
/// namespace was cleared.
pub type StoreObserver = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// One staged change inside a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Put { key: String, value: Value },
    Remove { key: String },
    Clear,
}

impl Mutation {
    pub fn put(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Mutation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Mutation::Remove { key: key.into() }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Mutation::Put { key, .. } | Mutation::Remove { key } => Some(key),
            Mutation::Clear => None,
        }
    }
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    fn get_all(&self) -> StoreResult<BTreeMap<String, Value>>;

    /// Applies `mutations` in order as a single atomic change.
    ///
    /// Returns `Ok(false)` when the store declined to persist the batch, in
    /// which case nothing was applied. Observers are notified only after a
    /// successful commit, once per distinct changed key, preceded by a single
    /// `None` when the batch contained a clear.
    fn commit(&self, mutations: &[Mutation]) -> StoreResult<bool>;

    /// Attaches a native change observer. Out-of-band writes must fire it too.
    fn on_change(&self, observer: StoreObserver);

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Keys reported by a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub cleared: bool,
    pub keys: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        !self.cleared && self.keys.is_empty()
    }

    /// Delivers the change set to `observer` in notification order.
    pub fn notify(&self, observer: &StoreObserver) {
        if self.cleared {
            observer(None);
        }
        for key in &self.keys {
            observer(Some(key));
        }
    }
}

/// Applies `mutations` to an in-memory map and reports what changed.
///
/// A key counts as changed when its final value differs from the value it
/// had before the batch touched it. A clear resets that baseline: keys
/// written afterwards are compared against the empty namespace, keys touched
/// before it are folded into the clear.
pub fn apply_mutations(entries: &mut BTreeMap<String, Value>, mutations: &[Mutation]) -> ChangeSet {
    let mut cleared = false;
    let mut touched: Vec<String> = Vec::new();
    let mut previous: BTreeMap<String, Option<Value>> = BTreeMap::new();

    for mutation in mutations {
        if let Some(key) = mutation.key() {
            if !previous.contains_key(key) {
                previous.insert(key.to_string(), entries.get(key).cloned());
                touched.push(key.to_string());
            }
        }

        match mutation {
            Mutation::Put { key, value } if !value.is_null() => {
                entries.insert(key.clone(), value.clone());
            }
            Mutation::Put { key, .. } | Mutation::Remove { key } => {
                entries.remove(key);
            }
            Mutation::Clear => {
                entries.clear();
                cleared = true;
                touched.clear();
                previous.clear();
            }
        }
    }

    let keys = touched
        .into_iter()
        .filter(|key| previous.get(key).and_then(Option::as_ref) != entries.get(key))
        .collect();

    ChangeSet { cleared, keys }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, i32)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), Value::Int(*value)))
            .collect()
    }

    #[test]
    fn reports_each_distinct_changed_key_once() {
        let mut map = entries(&[("a", 1)]);
        let changes = apply_mutations(
            &mut map,
            &[
                Mutation::put("a", 2),
                Mutation::put("b", 3),
                Mutation::put("a", 4),
            ],
        );
        assert_eq!(
            changes,
            ChangeSet {
                cleared: false,
                keys: vec!["a".into(), "b".into()],
            }
        );
        assert_eq!(map, entries(&[("a", 4), ("b", 3)]));
    }

    #[test]
    fn unchanged_values_are_not_reported() {
        let mut map = entries(&[("a", 1)]);
        let changes = apply_mutations(
            &mut map,
            &[
                Mutation::put("a", 1),
                Mutation::remove("missing"),
                Mutation::remove("a"),
                Mutation::put("a", 1),
            ],
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn clear_folds_earlier_keys_and_resets_baseline() {
        let mut map = entries(&[("a", 1), ("b", 2)]);
        let changes = apply_mutations(
            &mut map,
            &[
                Mutation::remove("a"),
                Mutation::Clear,
                Mutation::put("b", 2),
            ],
        );
        assert!(changes.cleared);
        assert_eq!(changes.keys, vec!["b".to_string()]);
        assert_eq!(map, entries(&[("b", 2)]));
    }

    #[test]
    fn remove_then_put_of_same_key_keeps_the_put() {
        let mut map = entries(&[("s", 9)]);
        let changes = apply_mutations(&mut map, &[Mutation::remove("s"), Mutation::put("s", 1)]);
        assert_eq!(changes.keys, vec!["s".to_string()]);
        assert_eq!(map, entries(&[("s", 1)]));
    }
}
