//! Local files, File System Access handles, and the file picker.
//!
//! Where `showOpenFilePicker` exists the picker returns a handle alongside
//! the file, so the document can be re-read later. Elsewhere it falls back
//! to a hidden `<input type="file">` and the pick is a one-shot upload.

use gloo_events::EventListener;
use js_sys::{Array, Function, Object, Promise, Reflect};
use mdview_core::{FileError, FilePicker, FileReference, LocalFile, PickedFile};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlInputElement;

use crate::interop::{call_async, describe, document, error_name, window, window_has};

/// A `File` object from a pick or a handle.
#[derive(Debug, Clone)]
pub struct BrowserFile {
    file: web_sys::File,
    name: String,
}

impl BrowserFile {
    pub fn new(file: web_sys::File) -> Self {
        let name = file.name();
        Self { file, name }
    }
}

impl LocalFile for BrowserFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_text(&self) -> Result<String, FileError> {
        let unreadable = |reason: String| FileError::Unreadable {
            name: self.name.clone(),
            reason,
        };
        let value = JsFuture::from(self.file.text())
            .await
            .map_err(|e| unreadable(describe(&e)))?;
        value
            .as_string()
            .ok_or_else(|| unreadable("file text was not a string".into()))
    }
}

/// A `FileSystemFileHandle`, held as an opaque JS value.
///
/// Handles restored from IndexedDB may have lost their read permission;
/// that shows up as a failed `reacquire`.
#[derive(Debug, Clone)]
pub struct BrowserFileHandle {
    handle: JsValue,
}

impl BrowserFileHandle {
    pub fn from_js(handle: JsValue) -> Self {
        Self { handle }
    }

    pub fn as_js(&self) -> &JsValue {
        &self.handle
    }

    pub fn name(&self) -> Option<String> {
        Reflect::get(&self.handle, &JsValue::from_str("name"))
            .ok()
            .and_then(|n| n.as_string())
    }
}

impl FileReference for BrowserFileHandle {
    type File = BrowserFile;

    async fn reacquire(&self) -> Result<BrowserFile, FileError> {
        let file = call_async(&self.handle, "getFile")
            .await
            .and_then(|value| value.dyn_into::<web_sys::File>())
            .map_err(|e| FileError::Revoked(describe(&e)))?;
        Ok(BrowserFile::new(file))
    }
}

/// Picks one Markdown file.
#[derive(Debug, Clone)]
pub struct BrowserPicker {
    extensions: Vec<String>,
}

impl BrowserPicker {
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions.to_vec(),
        }
    }

    async fn pick_with_handle(
        &self,
    ) -> Result<Option<PickedFile<BrowserFile, BrowserFileHandle>>, JsValue> {
        let window = window()?;
        let show: Function =
            Reflect::get(&window, &JsValue::from_str("showOpenFilePicker"))?.dyn_into()?;
        let promise: Promise = show.call1(&window, &self.picker_options()?.into())?.dyn_into()?;

        let handles: Array = match JsFuture::from(promise).await {
            Ok(value) => value.dyn_into()?,
            Err(e) if error_name(&e).as_deref() == Some("AbortError") => return Ok(None),
            Err(e) => return Err(e),
        };
        if handles.length() == 0 {
            return Ok(None);
        }

        let handle = BrowserFileHandle::from_js(handles.get(0));
        let file = handle
            .reacquire()
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Some(PickedFile::with_reference(file, handle)))
    }

    /// `{ multiple: false, types: [{ description, accept: { "text/markdown": [...] } }] }`
    fn picker_options(&self) -> Result<Object, JsValue> {
        let suffixes = Array::new();
        for ext in &self.extensions {
            suffixes.push(&JsValue::from_str(ext));
        }
        let accept = Object::new();
        Reflect::set(&accept, &JsValue::from_str("text/markdown"), &suffixes)?;

        let file_type = Object::new();
        Reflect::set(
            &file_type,
            &JsValue::from_str("description"),
            &JsValue::from_str("Markdown"),
        )?;
        Reflect::set(&file_type, &JsValue::from_str("accept"), &accept)?;

        let options = Object::new();
        Reflect::set(&options, &JsValue::from_str("multiple"), &JsValue::FALSE)?;
        Reflect::set(&options, &JsValue::from_str("types"), &Array::of1(&file_type))?;
        Ok(options)
    }

    async fn pick_with_input(
        &self,
    ) -> Result<Option<PickedFile<BrowserFile, BrowserFileHandle>>, JsValue> {
        let input: HtmlInputElement = document()?.create_element("input")?.dyn_into()?;
        input.set_type("file");
        input.set_accept(&self.extensions.join(","));

        let mut listeners = Vec::with_capacity(2);
        let promise = Promise::new(&mut |resolve: Function, _reject: Function| {
            let on_change = resolve.clone();
            listeners.push(EventListener::once(&input, "change", move |_| {
                let _ = on_change.call1(&JsValue::NULL, &JsValue::TRUE);
            }));
            listeners.push(EventListener::once(&input, "cancel", move |_| {
                let _ = resolve.call1(&JsValue::NULL, &JsValue::FALSE);
            }));
        });
        input.click();

        let chosen = JsFuture::from(promise).await?.as_bool().unwrap_or(false);
        drop(listeners);
        if !chosen {
            return Ok(None);
        }

        Ok(input
            .files()
            .and_then(|files| files.get(0))
            .map(|file| PickedFile::upload(BrowserFile::new(file))))
    }
}

impl FilePicker for BrowserPicker {
    type File = BrowserFile;
    type Reference = BrowserFileHandle;

    async fn pick(&self) -> Option<PickedFile<BrowserFile, BrowserFileHandle>> {
        if window_has("showOpenFilePicker") {
            match self.pick_with_handle().await {
                Ok(picked) => return picked,
                Err(e) => {
                    tracing::warn!(
                        "file system access picker failed, using upload: {}",
                        describe(&e)
                    );
                }
            }
        }

        match self.pick_with_input().await {
            Ok(picked) => picked,
            Err(e) => {
                tracing::error!("file input failed: {}", describe(&e));
                None
            }
        }
    }
}
