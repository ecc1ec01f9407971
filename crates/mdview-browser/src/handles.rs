//! Durable file handle store over IndexedDB.
//!
//! File System Access handles survive structured cloning, so they are put
//! into a single object store keyed by identity. The database is opened
//! lazily on first use and kept open for the life of the store.

use std::cell::RefCell;

use js_sys::{Function, Promise};
use mdview_core::error::StoreError;
use mdview_core::{DocumentId, DurableStore, ViewerConfig};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Event, IdbDatabase, IdbObjectStore, IdbRequest, IdbTransactionMode};

use crate::files::BrowserFileHandle;
use crate::interop::{describe, window};

/// `DurableStore` of file handles, keyed by document identity.
pub struct IdbHandleStore {
    db_name: String,
    store_name: String,
    version: u32,
    db: RefCell<Option<IdbDatabase>>,
}

impl IdbHandleStore {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            db_name: config.durable_db_name.clone(),
            store_name: config.durable_store_name.clone(),
            version: config.durable_db_version,
            db: RefCell::new(None),
        }
    }

    async fn database(&self) -> Result<IdbDatabase, StoreError> {
        if let Some(db) = self.db.borrow().as_ref() {
            return Ok(db.clone());
        }

        let factory = window()
            .and_then(|w| w.indexed_db())
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::Unavailable("IndexedDB is not available".into()))?;
        let request = factory
            .open_with_u32(&self.db_name, self.version)
            .map_err(unavailable)?;

        let upgrade_request = request.clone();
        let store_name = self.store_name.clone();
        let on_upgrade = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            let db = match upgrade_request
                .result()
                .and_then(|value| value.dyn_into::<IdbDatabase>())
            {
                Ok(db) => db,
                Err(e) => {
                    tracing::error!("upgrade without a database: {}", describe(&e));
                    return;
                }
            };
            if !db.object_store_names().contains(&store_name) {
                if let Err(e) = db.create_object_store(&store_name) {
                    tracing::error!("could not create `{}`: {}", store_name, describe(&e));
                }
            }
        });
        request.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));

        let opened = settle(&request).await;
        request.set_onupgradeneeded(None);
        drop(on_upgrade);

        let db: IdbDatabase = opened
            .and_then(|value| value.dyn_into())
            .map_err(unavailable)?;
        tracing::debug!(name = %self.db_name, version = self.version, "opened handle database");

        *self.db.borrow_mut() = Some(db.clone());
        Ok(db)
    }

    async fn object_store(&self, mode: IdbTransactionMode) -> Result<IdbObjectStore, StoreError> {
        let db = self.database().await?;
        db.transaction_with_str_and_mode(&self.store_name, mode)
            .and_then(|tx| tx.object_store(&self.store_name))
            .map_err(unavailable)
    }
}

impl DurableStore for IdbHandleStore {
    type Reference = BrowserFileHandle;

    async fn put(&self, id: &DocumentId, reference: &BrowserFileHandle) -> Result<(), StoreError> {
        let store = self.object_store(IdbTransactionMode::Readwrite).await?;
        let request = store
            .put_with_key(reference.as_js(), &JsValue::from_str(id.as_str()))
            .map_err(unavailable)?;
        settle(&request).await.map_err(unavailable)?;
        Ok(())
    }

    async fn get(&self, id: &DocumentId) -> Result<Option<BrowserFileHandle>, StoreError> {
        let store = self.object_store(IdbTransactionMode::Readonly).await?;
        let request = store
            .get(&JsValue::from_str(id.as_str()))
            .map_err(unavailable)?;
        let value = settle(&request).await.map_err(unavailable)?;
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        Ok(Some(BrowserFileHandle::from_js(value)))
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        let store = self.object_store(IdbTransactionMode::Readwrite).await?;
        let request = store
            .delete(&JsValue::from_str(id.as_str()))
            .map_err(unavailable)?;
        settle(&request).await.map_err(unavailable)?;
        Ok(())
    }
}

/// Await an IndexedDB request: its `result` on success, its `error` on
/// failure.
async fn settle(request: &IdbRequest) -> Result<JsValue, JsValue> {
    let mut handlers = None;
    let promise = Promise::new(&mut |resolve: Function, reject: Function| {
        let success_request = request.clone();
        let on_success = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            let value = success_request.result().unwrap_or(JsValue::UNDEFINED);
            let _ = resolve.call1(&JsValue::NULL, &value);
        });
        let error_request = request.clone();
        let on_error = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            let error = match error_request.error() {
                Ok(Some(exception)) => JsValue::from(exception),
                _ => JsValue::from_str("request failed"),
            };
            let _ = reject.call1(&JsValue::NULL, &error);
        });
        request.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
        request.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        handlers = Some((on_success, on_error));
    });

    let result = JsFuture::from(promise).await;
    request.set_onsuccess(None);
    request.set_onerror(None);
    drop(handlers);
    result
}

fn unavailable(error: JsValue) -> StoreError {
    StoreError::Unavailable(describe(&error))
}
