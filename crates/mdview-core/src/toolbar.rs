//! What the toolbar shows and which buttons are live.

use serde::Serialize;

use crate::record::DocumentRecord;

/// Shown in place of content when nothing is open.
pub const PLACEHOLDER_TEXT: &str = "Open a Markdown file to get started.";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarState {
    pub file_name: Option<String>,
    pub can_refresh: bool,
    pub can_export_pdf: bool,
    pub can_export_png: bool,
    /// Tooltip for a disabled PNG button.
    pub png_hint: Option<&'static str>,
}

impl ToolbarState {
    pub fn derive(document: Option<&DocumentRecord>, diagrams_ready: bool) -> Self {
        let Some(document) = document else {
            return Self::default();
        };
        let has_content = document.has_content();
        let png_hint = if !has_content {
            Some("Nothing to export")
        } else if !diagrams_ready {
            Some("Waiting for diagrams to finish rendering")
        } else {
            None
        };

        Self {
            file_name: (!document.file_name.is_empty()).then(|| document.file_name.clone()),
            can_refresh: !document.file_name.is_empty(),
            can_export_pdf: has_content,
            can_export_png: has_content && diagrams_ready,
            png_hint,
        }
    }
}
