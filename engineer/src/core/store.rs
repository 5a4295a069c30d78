//! Namespaced key-value views over one shared root mapping.
//!
//! A [`RootStore`] owns `identifier -> (key -> value)` for a whole session.
//! Every [`NamespacedStore`] holds a handle to the same root and only ever
//! touches the inner table of its own identifier. Values are opaque JSON.
//!
//! The root is single-threaded by construction (`Rc<RefCell<_>>`): borrows are
//! scoped to one store call and never escape it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::core::error::StoreError;

/// Inner mapping of one namespace.
pub type Table = BTreeMap<String, Value>;

/// Whole-session mapping from identifier to table.
pub type RootMap = BTreeMap<String, Table>;

/// Shared backing mapping for all stores of one session.
#[derive(Debug, Clone, Default)]
pub struct RootStore {
    inner: Rc<RefCell<RootMap>>,
}

impl RootStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: RootMap) -> Self {
        Self {
            inner: Rc::new(RefCell::new(map)),
        }
    }

    /// Build a root from a JSON object of objects (e.g. a persisted `store.json`).
    pub fn from_value(value: Value) -> Result<Self> {
        let map: RootMap =
            serde_json::from_value(value).context("root store must map identifiers to objects")?;
        Ok(Self::from_map(map))
    }

    /// Open (or create) the namespace `identifier` over this root.
    pub fn namespace(&self, identifier: impl Into<String>) -> NamespacedStore {
        NamespacedStore::new(self, identifier)
    }

    /// Deep copy of the whole mapping.
    pub fn snapshot(&self) -> RootMap {
        self.inner.borrow().clone()
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.inner.borrow().keys().cloned().collect()
    }

    /// True when both handles point at the same backing mapping.
    pub fn shares_backing_with(&self, other: &RootStore) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// A key-value table scoped to one identifier of a [`RootStore`].
#[derive(Debug, Clone)]
pub struct NamespacedStore {
    root: RootStore,
    identifier: String,
}

impl NamespacedStore {
    /// Bind to `identifier`, creating an empty table only if it is absent.
    pub fn new(root: &RootStore, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        root.inner
            .borrow_mut()
            .entry(identifier.clone())
            .or_default();
        Self {
            root: root.clone(),
            identifier,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn root(&self) -> &RootStore {
        &self.root
    }

    pub fn contains(&self, key: &str) -> bool {
        self.root
            .inner
            .borrow()
            .get(&self.identifier)
            .is_some_and(|table| table.contains_key(key))
    }

    /// Value stored under `key`, or [`StoreError::KeyNotFound`].
    pub fn get_required(&self, key: &str) -> Result<Value, StoreError> {
        self.get(key)
            .ok_or_else(|| StoreError::key_not_found(&self.identifier, key))
    }

    /// Value stored under `key`, or `default` when absent.
    pub fn get_or_default(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.root
            .inner
            .borrow()
            .get(&self.identifier)
            .and_then(|table| table.get(key))
            .cloned()
    }

    /// Insert or overwrite `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        debug!(namespace = %self.identifier, key = %key, "store set");
        self.root
            .inner
            .borrow_mut()
            .entry(self.identifier.clone())
            .or_default()
            .insert(key, value.into());
    }

    /// Keys in lexicographic order.
    pub fn keys(&self) -> Vec<String> {
        self.root
            .inner
            .borrow()
            .get(&self.identifier)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Value copy of the whole table; later writes do not affect it.
    pub fn snapshot(&self) -> Table {
        self.root
            .inner
            .borrow()
            .get(&self.identifier)
            .cloned()
            .unwrap_or_default()
    }
}
