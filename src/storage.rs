use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Durable string key-value storage underneath the data store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Writes every pair or none of them.
    fn set_many(&mut self, entries: &[(String, String)]) -> anyhow::Result<()>;

    fn remove(&mut self, key: &str) -> anyhow::Result<()>;

    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        self.set_many(&[(key.to_string(), value)])
    }
}

/// In-process storage. Clones share the same map, so a second store can be
/// opened over what the first one wrote.
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    inner: Rc<RefCell<BTreeMap<String, String>>>,
}

#[cfg_attr(not(test), allow(dead_code))]
impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().keys().cloned().collect()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.inner.borrow().get(key).cloned())
    }

    fn set_many(&mut self, entries: &[(String, String)]) -> anyhow::Result<()> {
        let mut map = self.inner.borrow_mut();
        for (k, v) in entries {
            map.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.inner.borrow_mut().remove(key);
        Ok(())
    }
}
