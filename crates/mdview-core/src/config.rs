use serde::{Deserialize, Serialize};

/// Viewer configuration.
///
/// Every field has a default, so hosts can pass a partial JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Prefix for document records in the fast store.
    pub fast_key_prefix: String,
    /// Prefix for the per-tab "stale prompt shown" markers.
    pub prompt_key_prefix: String,
    /// IndexedDB database holding escrowed file handles.
    pub durable_db_name: String,
    /// Object store inside `durable_db_name`.
    pub durable_store_name: String,
    pub durable_db_version: u32,
    /// File name suffixes accepted by `open`, compared case-insensitively.
    pub accepted_extensions: Vec<String>,
    /// Distance from the viewport top, in CSS pixels, at which a heading
    /// becomes the active one.
    pub heading_threshold_px: f64,
    pub png_pixel_ratio: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fast_key_prefix: "mdview_doc:".to_owned(),
            prompt_key_prefix: "mdview_prompted:".to_owned(),
            durable_db_name: "mdview".to_owned(),
            durable_store_name: "file_handles".to_owned(),
            durable_db_version: 1,
            accepted_extensions: vec![".md".to_owned()],
            heading_threshold_px: 80.0,
            png_pixel_ratio: 2.0,
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether a picked file name passes the extension filter.
    pub fn accepts(&self, file_name: &str) -> bool {
        let lowered = file_name.to_lowercase();
        self.accepted_extensions
            .iter()
            .any(|ext| lowered.ends_with(&ext.to_lowercase()))
    }
}
