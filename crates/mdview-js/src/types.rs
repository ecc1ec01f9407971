//! Types exposed to JavaScript via wasm-bindgen.

use mdview_core::{Notice, OutlineEntry, ToolbarState};
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

/// Toolbar snapshot for the host UI.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsToolbar {
    /// Shown next to the actions. Absent when nothing is open.
    pub file_name: Option<String>,
    pub can_refresh: bool,
    pub can_export_pdf: bool,
    pub can_export_png: bool,
    /// Why PNG export is disabled, if it is.
    pub png_hint: Option<String>,
    /// Cached text is on screen while the live file is being re-read.
    pub stale: bool,
}

impl JsToolbar {
    pub fn new(state: ToolbarState, stale: bool) -> Self {
        Self {
            file_name: state.file_name,
            can_refresh: state.can_refresh,
            can_export_pdf: state.can_export_pdf,
            can_export_png: state.can_export_png,
            png_hint: state.png_hint.map(str::to_owned),
            stale,
        }
    }
}

/// One heading, for building a table of contents.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsOutlineEntry {
    pub level: u8,
    pub text: String,
    pub id: String,
}

impl From<&OutlineEntry> for JsOutlineEntry {
    fn from(entry: &OutlineEntry) -> Self {
        Self {
            level: entry.level,
            text: entry.text.clone(),
            id: entry.id.clone(),
        }
    }
}

/// A non-blocking notice for the host to show.
///
/// `stalePrompt` expects an answer through `resolveStalePrompt`.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum JsNotice {
    StalePrompt { file_name: String },
    NothingToRefresh,
    RefreshFailed { file_name: String },
    ExportFailed { message: String },
}

impl From<Notice> for JsNotice {
    fn from(notice: Notice) -> Self {
        match notice {
            Notice::StalePrompt { file_name, .. } => Self::StalePrompt { file_name },
            Notice::NothingToRefresh => Self::NothingToRefresh,
            Notice::RefreshFailed { file_name } => Self::RefreshFailed { file_name },
            Notice::ExportFailed(message) => Self::ExportFailed { message },
        }
    }
}
