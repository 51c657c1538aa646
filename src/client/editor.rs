use crate::address::Address;
use crate::codec;
use crate::types::{StringSet, Value, WireRow};

use super::{ClientError, RemoteStoreClient};

/// Batch of changes committed to the client's namespace in one write.
///
/// Removals (including a clear) are sent before additions, so
/// `remove("k")` followed by `put_int("k", 1)` leaves `k == 1`. An invalid
/// key is remembered and reported by [`Editor::commit`].
#[must_use = "an editor does nothing until committed"]
pub struct Editor<'a> {
    client: &'a RemoteStoreClient,
    clear: bool,
    removals: Vec<String>,
    additions: Vec<(String, Value)>,
    error: Option<ClientError>,
}

impl<'a> Editor<'a> {
    pub(crate) fn new(client: &'a RemoteStoreClient) -> Self {
        Self {
            client,
            clear: false,
            removals: Vec::new(),
            additions: Vec::new(),
            error: None,
        }
    }

    pub fn put_string(self, key: &str, value: impl Into<String>) -> Self {
        self.put(key, Value::String(value.into()))
    }

    pub fn put_string_set<I, S>(self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: StringSet = values.into_iter().map(Into::into).collect();
        self.put(key, Value::StringSet(set))
    }

    pub fn put_int(self, key: &str, value: i32) -> Self {
        self.put(key, Value::Int(value))
    }

    pub fn put_long(self, key: &str, value: i64) -> Self {
        self.put(key, Value::Long(value))
    }

    pub fn put_float(self, key: &str, value: f32) -> Self {
        self.put(key, Value::Float(value))
    }

    pub fn put_boolean(self, key: &str, value: bool) -> Self {
        self.put(key, Value::Boolean(value))
    }

    /// Stages `value` under `key`. `Value::Null` stages a removal instead.
    pub fn put(mut self, key: &str, value: Value) -> Self {
        if !self.accept_key(key) {
            return self;
        }
        self.additions.retain(|(staged, _)| staged != key);
        if value.is_null() {
            self.stage_removal(key);
        } else {
            self.additions.push((key.to_string(), value));
        }
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        if self.accept_key(key) {
            self.stage_removal(key);
        }
        self
    }

    /// Removes every entry of the namespace before the additions apply.
    pub fn clear(mut self) -> Self {
        self.clear = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.clear && self.removals.is_empty() && self.additions.is_empty()
    }

    /// Sends the batch and waits for the outcome.
    ///
    /// Returns `Ok(false)` in lenient mode when the write could not be
    /// delivered or was refused; the remote namespace is then unchanged.
    pub fn commit(self) -> Result<bool, ClientError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let client = self.client;
        let rows = build_rows(self.clear, self.removals, self.additions);
        if rows.is_empty() {
            return Ok(true);
        }

        let address = client.namespace_address()?;
        match client.transport().bulk_write(&address, rows) {
            Ok(_) => Ok(true),
            Err(source) => client.degrade(source, false),
        }
    }

    /// Commits without reporting the outcome; failures are only logged.
    pub fn apply(self) {
        let namespace = self.client.namespace().to_string();
        match self.commit() {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(namespace = %namespace, "applied edit was not committed");
            }
            Err(err) => {
                tracing::warn!(namespace = %namespace, error = %err, "applied edit failed");
            }
        }
    }

    fn accept_key(&mut self, key: &str) -> bool {
        if self.error.is_some() {
            return false;
        }
        match Address::entry(self.client.namespace(), key) {
            Ok(_) => true,
            Err(source) => {
                self.error = Some(ClientError::InvalidKey {
                    key: key.to_string(),
                    source,
                });
                false
            }
        }
    }

    fn stage_removal(&mut self, key: &str) {
        if !self.removals.iter().any(|staged| staged == key) {
            self.removals.push(key.to_string());
        }
    }
}

fn build_rows(clear: bool, removals: Vec<String>, additions: Vec<(String, Value)>) -> Vec<WireRow> {
    let mut rows = Vec::with_capacity(usize::from(clear) + removals.len() + additions.len());
    if clear {
        rows.push(WireRow::clear());
    }
    rows.extend(removals.into_iter().map(WireRow::removal));
    rows.extend(additions.into_iter().map(|(key, value)| {
        let (tag, raw) = codec::encode(&value);
        WireRow::new(key, tag, raw)
    }));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeTag, WireValue};

    #[test]
    fn removals_precede_additions() {
        let rows = build_rows(
            true,
            vec!["s".to_string()],
            vec![("s".to_string(), Value::Int(1))],
        );
        assert_eq!(
            rows,
            vec![
                WireRow::clear(),
                WireRow::removal("s"),
                WireRow::new("s", TypeTag::Int, WireValue::Int(1)),
            ]
        );
    }
}
