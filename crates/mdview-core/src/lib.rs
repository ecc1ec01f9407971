//! mdview-core: document session state for the mdview markdown viewer.
//!
//! This crate provides:
//! - `SessionController` - decides which document is shown and which source wins
//! - `FastStore` / `DurableStore` - the two persistence tiers, plus in-memory stores
//! - `SessionLocator` - the URL fragment codec (`file=`, `heading=`, passthrough)
//! - `SessionPlatform` - the traits a host (browser, tests) implements
//! - Outline anchors, scroll tracking, export gating and toolbar state

pub mod config;
pub mod error;
pub mod export;
pub mod identity;
pub mod locator;
pub mod outline;
pub mod perf;
pub mod platform;
pub mod record;
pub mod scroll;
pub mod session;
pub mod store;
pub mod strategy;
pub mod toolbar;

pub use config::ViewerConfig;
pub use error::{ExportError, FileError, StoreError};
pub use export::{ExportKind, ExportRequest, check_export, export_base_name, png_file_name};
pub use identity::{DocumentId, IdentityGenerator};
pub use locator::{AddressBar, MemoryAddressBar, SessionLocator, read_locator, update_locator};
pub use outline::{AnchorAllocator, OutlineEntry, slugify};
pub use platform::{
    FilePicker, FileReference, LocalFile, Notice, PickedFile, SessionPlatform, Viewport,
};
pub use perf::Stopwatch;
pub use record::{AccessMode, DocumentRecord};
pub use scroll::active_heading;
pub use session::{
    ContentVersion, OpenOutcome, RefreshOutcome, RestoreOutcome, SessionController,
    SessionPhase, StaleChoice,
};
pub use smol_str::SmolStr;
pub use store::{DurableStore, FastStore, MemoryDurableStore, MemoryFastStore};
pub use strategy::{RefreshStep, RestoreStep, refresh_plan, restore_plan};
pub use toolbar::{PLACEHOLDER_TEXT, ToolbarState};
