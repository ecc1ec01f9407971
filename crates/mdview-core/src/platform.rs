//! Platform abstraction traits for the session controller.
//!
//! These traits define the interface between session logic and the host
//! (browser APIs, test doubles). Every suspension point the controller has
//! (file reads, picker dialogs, durable storage) sits behind one of them.

use std::future::Future;

use crate::identity::DocumentId;
use crate::locator::AddressBar;
use crate::record::AccessMode;
use crate::session::ContentVersion;
use crate::store::{DurableStore, FastStore};

pub use crate::error::FileError;

/// A plain file object: a name and bytes that can be read as text.
pub trait LocalFile: Clone {
    fn name(&self) -> &str;

    fn read_text(&self) -> impl Future<Output = Result<String, FileError>>;
}

/// A re-readable capability to a file on the local filesystem.
///
/// Validity is never assumed. Revocation is silent, so every use goes
/// through `reacquire`, which hands back a fresh file object or fails.
pub trait FileReference: Clone {
    type File: LocalFile;

    fn reacquire(&self) -> impl Future<Output = Result<Self::File, FileError>>;
}

/// The result of a user pick: always a file, sometimes a live reference.
#[derive(Debug, Clone)]
pub struct PickedFile<F, R> {
    pub file: F,
    pub reference: Option<R>,
}

impl<F, R> PickedFile<F, R> {
    /// A one-shot upload with no reference behind it.
    pub fn upload(file: F) -> Self {
        Self {
            file,
            reference: None,
        }
    }

    pub fn with_reference(file: F, reference: R) -> Self {
        Self {
            file,
            reference: Some(reference),
        }
    }

    pub fn access_mode(&self) -> AccessMode {
        AccessMode::from_reference(self.reference.is_some())
    }
}

/// User-facing file picker.
pub trait FilePicker {
    type File: LocalFile;
    type Reference: FileReference<File = Self::File>;

    /// `None` means the user dismissed the dialog.
    fn pick(&self) -> impl Future<Output = Option<PickedFile<Self::File, Self::Reference>>>;
}

/// Layout geometry and scrolling for the rendered document.
pub trait Viewport {
    /// Scroll the element with this anchor id into view. Returns `false`
    /// when no such element exists.
    fn scroll_to_anchor(&self, id: &str) -> bool;

    /// Offset of the anchor's top edge from the viewport top, in CSS pixels.
    fn anchor_top(&self, id: &str) -> Option<f64>;
}

/// Non-blocking, user-visible notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A cached copy is shown because the live file could not be re-read.
    /// The user may reload the latest version or keep the cached one.
    StalePrompt { id: DocumentId, file_name: String },
    /// Refresh was requested with no document open.
    NothingToRefresh,
    /// Every refresh source failed; the shown content is unchanged.
    RefreshFailed { file_name: String },
    ExportFailed(String),
}

/// Everything the session controller needs from its host.
pub trait SessionPlatform {
    type File: LocalFile;
    type Reference: FileReference<File = Self::File>;
    type Fast: FastStore;
    type Durable: DurableStore<Reference = Self::Reference>;
    type Picker: FilePicker<File = Self::File, Reference = Self::Reference>;
    type Address: AddressBar;
    type Viewport: Viewport;

    fn fast_store(&self) -> &Self::Fast;
    fn durable_store(&self) -> &Self::Durable;
    fn picker(&self) -> &Self::Picker;
    fn address_bar(&self) -> &Self::Address;
    fn viewport(&self) -> &Self::Viewport;

    fn notify(&self, notice: Notice);

    /// The shown text was replaced and now carries `version`.
    ///
    /// Called mid-command, e.g. when cached text goes up before a live
    /// re-read finishes. Hosts that render only after commands return can
    /// ignore it.
    fn content_changed(&self, _version: ContentVersion) {}
}
