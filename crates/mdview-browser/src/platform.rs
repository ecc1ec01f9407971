//! `SessionPlatform` for the browser.

use mdview_core::{ContentVersion, Notice, SessionPlatform, ViewerConfig};

use crate::files::{BrowserFile, BrowserFileHandle, BrowserPicker};
use crate::handles::IdbHandleStore;
use crate::location::LocationHash;
use crate::storage::SessionStorageStore;
use crate::viewport::DocumentViewport;

type NoticeSink = Box<dyn Fn(Notice)>;
type ChangeSink = Box<dyn Fn(ContentVersion)>;

/// Browser storage, file access, location and layout, plus a sink for
/// user-visible notices.
pub struct BrowserPlatform {
    fast: SessionStorageStore,
    durable: IdbHandleStore,
    picker: BrowserPicker,
    address: LocationHash,
    viewport: DocumentViewport,
    on_notice: Option<NoticeSink>,
    on_content: Option<ChangeSink>,
}

impl BrowserPlatform {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            fast: SessionStorageStore::new(config),
            durable: IdbHandleStore::new(config),
            picker: BrowserPicker::new(&config.accepted_extensions),
            address: LocationHash::new(),
            viewport: DocumentViewport::new(),
            on_notice: None,
            on_content: None,
        }
    }

    /// Route notices to `sink` instead of the log.
    pub fn with_notices(mut self, sink: impl Fn(Notice) + 'static) -> Self {
        self.on_notice = Some(Box::new(sink));
        self
    }

    /// Call `sink` whenever the shown text is replaced, including midway
    /// through a restore.
    pub fn with_content_hook(mut self, sink: impl Fn(ContentVersion) + 'static) -> Self {
        self.on_content = Some(Box::new(sink));
        self
    }
}

impl SessionPlatform for BrowserPlatform {
    type File = BrowserFile;
    type Reference = BrowserFileHandle;
    type Fast = SessionStorageStore;
    type Durable = IdbHandleStore;
    type Picker = BrowserPicker;
    type Address = LocationHash;
    type Viewport = DocumentViewport;

    fn fast_store(&self) -> &SessionStorageStore {
        &self.fast
    }

    fn durable_store(&self) -> &IdbHandleStore {
        &self.durable
    }

    fn picker(&self) -> &BrowserPicker {
        &self.picker
    }

    fn address_bar(&self) -> &LocationHash {
        &self.address
    }

    fn viewport(&self) -> &DocumentViewport {
        &self.viewport
    }

    fn notify(&self, notice: Notice) {
        match &self.on_notice {
            Some(sink) => sink(notice),
            None => tracing::info!(?notice, "notice"),
        }
    }

    fn content_changed(&self, version: ContentVersion) {
        if let Some(sink) = &self.on_content {
            sink(version);
        }
    }
}
