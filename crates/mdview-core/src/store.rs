//! Persistence tier.
//!
//! ## Fast store
//!
//! Per-tab, text-serialized, size-bounded (sessionStorage in the browser).
//! Holds one [`DocumentRecord`] per identity under `<prefix><identity>`, plus
//! a marker per identity recording that the stale-cache prompt was shown.
//! A failed `put` is logged by the caller, which then removes the entry so
//! it reads back later as "not cached" rather than as superseded text.
//!
//! ## Durable store
//!
//! Per-origin, outlives the tab (IndexedDB in the browser). Maps an identity
//! to a live file reference. Advisory only: it is consulted solely for
//! records whose access mode is `DirectAccess`, and whatever it returns is
//! re-validated before use.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;

use crate::error::StoreError;
use crate::identity::DocumentId;
use crate::record::DocumentRecord;

pub trait FastStore {
    fn put(&self, id: &DocumentId, record: &DocumentRecord) -> Result<(), StoreError>;

    /// Missing and undecodable entries both read as `None`.
    fn get(&self, id: &DocumentId) -> Option<DocumentRecord>;

    fn remove(&self, id: &DocumentId);

    fn prompt_shown(&self, id: &DocumentId) -> bool;

    fn mark_prompt_shown(&self, id: &DocumentId);
}

pub trait DurableStore {
    type Reference;

    fn put(
        &self,
        id: &DocumentId,
        reference: &Self::Reference,
    ) -> impl Future<Output = Result<(), StoreError>>;

    fn get(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Option<Self::Reference>, StoreError>>;

    fn delete(&self, id: &DocumentId) -> impl Future<Output = Result<(), StoreError>>;
}

/// In-memory fast store with an optional byte quota.
///
/// Values are stored as JSON text, like the browser store, so quota and
/// serialization behave the same way.
#[derive(Debug)]
pub struct MemoryFastStore {
    prefix: String,
    entries: RefCell<BTreeMap<String, String>>,
    prompted: RefCell<BTreeSet<DocumentId>>,
    quota_bytes: Option<usize>,
}

impl Default for MemoryFastStore {
    fn default() -> Self {
        Self::new("mdview_doc:")
    }
}

impl MemoryFastStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: RefCell::new(BTreeMap::new()),
            prompted: RefCell::new(BTreeSet::new()),
            quota_bytes: None,
        }
    }

    /// Reject writes once stored values would exceed `bytes`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    /// Raw stored text for a key, as the host would see it.
    pub fn raw(&self, id: &DocumentId) -> Option<String> {
        self.entries.borrow().get(&self.key(id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn key(&self, id: &DocumentId) -> String {
        format!("{}{}", self.prefix, id)
    }
}

impl FastStore for MemoryFastStore {
    fn put(&self, id: &DocumentId, record: &DocumentRecord) -> Result<(), StoreError> {
        let key = self.key(id);
        let value = record.to_json()?;

        if let Some(quota) = self.quota_bytes {
            let entries = self.entries.borrow();
            let used: usize = entries
                .iter()
                .filter(|(k, _)| **k != key)
                .map(|(_, v)| v.len())
                .sum();
            if used + value.len() > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }

        self.entries.borrow_mut().insert(key, value);
        Ok(())
    }

    fn get(&self, id: &DocumentId) -> Option<DocumentRecord> {
        let raw = self.raw(id)?;
        match DocumentRecord::from_json(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(%id, "undecodable fast store entry: {}", e);
                None
            }
        }
    }

    fn remove(&self, id: &DocumentId) {
        self.entries.borrow_mut().remove(&self.key(id));
    }

    fn prompt_shown(&self, id: &DocumentId) -> bool {
        self.prompted.borrow().contains(id)
    }

    fn mark_prompt_shown(&self, id: &DocumentId) {
        self.prompted.borrow_mut().insert(id.clone());
    }
}

/// In-memory durable store.
///
/// Counts lookups so callers can check the store was (or wasn't) consulted,
/// and can be switched into a failing mode to simulate an unavailable
/// database.
#[derive(Debug)]
pub struct MemoryDurableStore<R> {
    entries: RefCell<HashMap<DocumentId, R>>,
    lookups: Cell<usize>,
    unavailable: Cell<bool>,
}

impl<R> Default for MemoryDurableStore<R> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            lookups: Cell::new(0),
            unavailable: Cell::new(false),
        }
    }
}

impl<R: Clone> MemoryDurableStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.entries.borrow().contains_key(id)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.get() {
            Err(StoreError::Unavailable("memory store switched off".into()))
        } else {
            Ok(())
        }
    }
}

impl<R: Clone> DurableStore for MemoryDurableStore<R> {
    type Reference = R;

    async fn put(&self, id: &DocumentId, reference: &R) -> Result<(), StoreError> {
        self.check()?;
        self.entries
            .borrow_mut()
            .insert(id.clone(), reference.clone());
        Ok(())
    }

    async fn get(&self, id: &DocumentId) -> Result<Option<R>, StoreError> {
        self.lookups.set(self.lookups.get() + 1);
        self.check()?;
        Ok(self.entries.borrow().get(id).cloned())
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.check()?;
        self.entries.borrow_mut().remove(id);
        Ok(())
    }
}
