//! Browser platform for the mdview markdown viewer.
//!
//! This crate implements the `mdview-core` platform traits on top of
//! browser APIs. It assumes a `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `storage`: per-tab fast store over `sessionStorage`
//! - `handles`: durable file handle store over IndexedDB
//! - `files`: `File` objects, File System Access handles, and the picker
//! - `location`: the `#fragment` as an `AddressBar`
//! - `viewport`: anchor scrolling and heading geometry
//! - `diagrams`: mermaid rendering with pan/zoom, scoped to one render
//! - `export`: print and image capture
//! - `platform`: `BrowserPlatform`, tying the above together
//!
//! # Re-exports
//!
//! This crate re-exports `mdview-core` for convenience, so consumers
//! only need to depend on `mdview-browser`.

// Re-export core crate
pub use mdview_core;
pub use mdview_core::*;

pub mod diagrams;
pub mod export;
pub mod files;
pub mod handles;
mod interop;
pub mod location;
pub mod platform;
pub mod storage;
pub mod viewport;

pub use diagrams::DiagramScope;
pub use export::{capture_png, print_page};
pub use files::{BrowserFile, BrowserFileHandle, BrowserPicker};
pub use handles::IdbHandleStore;
pub use location::LocationHash;
pub use platform::BrowserPlatform;
pub use storage::SessionStorageStore;
pub use viewport::DocumentViewport;
