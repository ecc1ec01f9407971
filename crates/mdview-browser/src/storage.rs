//! Per-tab fast store over `sessionStorage`.
//!
//! Records are written as the JSON text of `DocumentRecord`, one key per
//! identity. A reopened tab (or a reload) sees the same entries; other tabs
//! do not.

use gloo_storage::errors::StorageError;
use gloo_storage::{SessionStorage, Storage};
use mdview_core::error::StoreError;
use mdview_core::{DocumentId, DocumentRecord, FastStore, ViewerConfig};

/// `FastStore` backed by the tab's session storage.
#[derive(Debug, Clone)]
pub struct SessionStorageStore {
    record_prefix: String,
    prompt_prefix: String,
}

impl SessionStorageStore {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            record_prefix: config.fast_key_prefix.clone(),
            prompt_prefix: config.prompt_key_prefix.clone(),
        }
    }

    fn record_key(&self, id: &DocumentId) -> String {
        format!("{}{}", self.record_prefix, id)
    }

    fn prompt_key(&self, id: &DocumentId) -> String {
        format!("{}{}", self.prompt_prefix, id)
    }
}

impl FastStore for SessionStorageStore {
    fn put(&self, id: &DocumentId, record: &DocumentRecord) -> Result<(), StoreError> {
        SessionStorage::set(self.record_key(id), record).map_err(store_error)
    }

    fn get(&self, id: &DocumentId) -> Option<DocumentRecord> {
        match SessionStorage::get::<DocumentRecord>(self.record_key(id)) {
            Ok(record) => Some(record),
            Err(StorageError::KeyNotFound(_)) => None,
            Err(e) => {
                tracing::warn!(%id, "unreadable session storage entry: {}", e);
                None
            }
        }
    }

    fn remove(&self, id: &DocumentId) {
        SessionStorage::delete(self.record_key(id));
    }

    fn prompt_shown(&self, id: &DocumentId) -> bool {
        SessionStorage::get::<bool>(self.prompt_key(id)).unwrap_or(false)
    }

    fn mark_prompt_shown(&self, id: &DocumentId) {
        if let Err(e) = SessionStorage::set(self.prompt_key(id), true) {
            tracing::warn!(%id, "could not record stale prompt marker: {}", e);
        }
    }
}

fn store_error(error: StorageError) -> StoreError {
    match error {
        StorageError::SerdeError(e) => StoreError::Serde(e),
        StorageError::JsError(e)
            if matches!(
                e.name.as_str(),
                "QuotaExceededError" | "NS_ERROR_DOM_QUOTA_REACHED"
            ) =>
        {
            StoreError::QuotaExceeded
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}
