//! Two-level resource addressing: `namespace ["/" [key]]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Locator for a read or write: a namespace plus an optional key.
///
/// `key == None` addresses the whole namespace. An empty key never survives
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    namespace: String,
    key: Option<String>,
}

impl Address {
    /// Parses `"<namespace>"`, `"<namespace>/"` or `"<namespace>/<key>"`.
    pub fn parse(path: &str) -> StoreResult<Self> {
        let invalid = |reason| StoreError::InvalidAddress {
            path: path.to_string(),
            reason,
        };

        let mut segments = path.split('/');
        let namespace = segments.next().unwrap_or_default();
        if namespace.is_empty() {
            return Err(invalid("namespace is empty"));
        }

        let key = match segments.next() {
            None | Some("") => None,
            Some(key) => Some(key.to_string()),
        };

        if segments.next().is_some() {
            return Err(invalid("too many path segments"));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            key,
        })
    }

    /// Address covering every entry of `namespace`.
    pub fn namespace(namespace: impl Into<String>) -> StoreResult<Self> {
        let namespace = namespace.into();
        validate_segment(
            &namespace,
            &namespace,
            "namespace is empty",
            "namespace contains '/'",
        )?;
        Ok(Self {
            namespace,
            key: None,
        })
    }

    /// Address of a single entry.
    pub fn entry(namespace: impl Into<String>, key: impl Into<String>) -> StoreResult<Self> {
        Self::namespace(namespace)?.with_key(key)
    }

    /// Narrows a namespace address to one key.
    pub fn with_key(self, key: impl Into<String>) -> StoreResult<Self> {
        let key = key.into();
        if self.key.is_some() {
            return Err(StoreError::InvalidAddress {
                path: self.to_string(),
                reason: "address already has a key",
            });
        }
        let path = format!("{}/{}", self.namespace, key);
        validate_segment(&key, &path, "key is empty", "key contains '/'")?;
        Ok(Self {
            namespace: self.namespace,
            key: Some(key),
        })
    }

    pub fn namespace_name(&self) -> &str {
        &self.namespace
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Key passed to the access-control hook (`""` for the whole namespace).
    pub fn access_key(&self) -> &str {
        self.key.as_deref().unwrap_or("")
    }

    #[inline]
    pub fn is_single_key(&self) -> bool {
        self.key.is_some()
    }

    /// Drops the key, yielding the enclosing namespace address.
    pub fn parent(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            key: None,
        }
    }
}

fn validate_segment(
    segment: &str,
    path: &str,
    empty: &'static str,
    has_slash: &'static str,
) -> StoreResult<()> {
    let reason = if segment.is_empty() {
        empty
    } else if segment.contains('/') {
        has_slash
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidAddress {
        path: path.to_string(),
        reason,
    })
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}/{}", self.namespace, key),
            None => f.write_str(&self.namespace),
        }
    }
}

impl FromStr for Address {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = StoreError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Address::parse(&path)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}
