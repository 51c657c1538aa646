use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::storage::KeyValueStore;

use super::access::{AccessPolicy, AllowAll};

/// One exposed namespace and the store that backs it.
#[derive(Clone)]
pub struct NamespaceBinding {
    pub name: String,
    pub store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for NamespaceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceBinding")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Configuration for a [`StoreEndpoint`](super::StoreEndpoint).
///
/// The namespace set is fixed once the endpoint is built.
#[derive(Clone)]
pub struct EndpointConfig {
    pub namespaces: Vec<NamespaceBinding>,
    pub access: Arc<dyn AccessPolicy>,
}

impl EndpointConfig {
    pub fn new() -> Self {
        Self {
            namespaces: Vec::new(),
            access: Arc::new(AllowAll),
        }
    }

    /// Exposes `store` under `name`.
    pub fn with_namespace(mut self, name: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        self.namespaces.push(NamespaceBinding {
            name: name.into(),
            store,
        });
        self
    }

    /// Replaces the default allow-everything policy.
    pub fn with_access_policy<P>(mut self, policy: P) -> Self
    where
        P: AccessPolicy + 'static,
    {
        self.access = Arc::new(policy);
        self
    }

    pub fn with_shared_access_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.access = policy;
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.namespaces.is_empty() {
            return Err(invalid("at least one namespace must be exposed"));
        }

        let mut seen = HashSet::with_capacity(self.namespaces.len());
        for binding in &self.namespaces {
            if binding.name.is_empty() {
                return Err(invalid("namespace names must not be empty"));
            }
            if binding.name.contains('/') {
                return Err(invalid(format!(
                    "namespace `{}` must not contain '/'",
                    binding.name
                )));
            }
            if !seen.insert(binding.name.as_str()) {
                return Err(invalid(format!(
                    "namespace `{}` is bound more than once",
                    binding.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("namespaces", &self.namespaces)
            .finish_non_exhaustive()
    }
}

fn invalid(reason: impl Into<String>) -> StoreError {
    StoreError::InvalidConfiguration {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn rejects_empty_and_duplicate_bindings() {
        assert!(EndpointConfig::new().validate().is_err());
        assert!(EndpointConfig::new()
            .with_namespace("", store())
            .validate()
            .is_err());
        assert!(EndpointConfig::new()
            .with_namespace("a/b", store())
            .validate()
            .is_err());

        let err = EndpointConfig::new()
            .with_namespace("prefs", store())
            .with_namespace("prefs", store())
            .validate()
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfiguration { .. }));
    }

    #[test]
    fn accepts_distinct_names() {
        EndpointConfig::new()
            .with_namespace("main", store())
            .with_namespace("audio", store())
            .validate()
            .unwrap();
    }

    #[test]
    fn shared_policy_is_one_instance_across_endpoints() {
        use crate::endpoint::{ReadOnly, StoreEndpoint};
        use crate::types::{TypeTag, WireRow, WireValue};
        use crate::Address;

        let policy: Arc<dyn AccessPolicy> = Arc::new(ReadOnly);
        let main = EndpointConfig::new()
            .with_namespace("main", store())
            .with_shared_access_policy(Arc::clone(&policy));
        let audio = EndpointConfig::new()
            .with_namespace("audio", store())
            .with_shared_access_policy(Arc::clone(&policy));
        assert!(Arc::ptr_eq(&main.access, &audio.access));

        for (config, namespace) in [(main, "main"), (audio, "audio")] {
            let endpoint = StoreEndpoint::new(config).unwrap();
            let target = Address::namespace(namespace).unwrap();
            let row = WireRow::new("k", TypeTag::Int, WireValue::Int(1));
            assert!(matches!(
                endpoint.write(&target, vec![row]),
                Err(StoreError::AccessDenied { .. })
            ));
        }
    }
}
