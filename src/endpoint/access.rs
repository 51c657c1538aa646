/// Access-control hook consulted before every read and write.
///
/// `key` is `""` for whole-namespace operations. Whole-namespace reads are
/// checked once, never per entry.
pub trait AccessPolicy: Send + Sync {
    fn allow(&self, namespace: &str, key: &str, is_write: bool) -> bool;
}

impl<F> AccessPolicy for F
where
    F: Fn(&str, &str, bool) -> bool + Send + Sync,
{
    fn allow(&self, namespace: &str, key: &str, is_write: bool) -> bool {
        self(namespace, key, is_write)
    }
}

/// Grants every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn allow(&self, _namespace: &str, _key: &str, _is_write: bool) -> bool {
        true
    }
}

/// Refuses writes everywhere while leaving reads open.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnly;

impl AccessPolicy for ReadOnly {
    fn allow(&self, _namespace: &str, _key: &str, is_write: bool) -> bool {
        !is_write
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_act_as_policies() {
        let policy = |_: &str, key: &str, is_write: bool| !(is_write && key == "secret");
        assert!(policy.allow("prefs", "secret", false));
        assert!(!policy.allow("prefs", "secret", true));
        assert!(policy.allow("prefs", "", true));
    }

    #[test]
    fn read_only_refuses_writes() {
        assert!(ReadOnly.allow("prefs", "k", false));
        assert!(!ReadOnly.allow("prefs", "k", true));
        assert!(AllowAll.allow("prefs", "", true));
    }
}
