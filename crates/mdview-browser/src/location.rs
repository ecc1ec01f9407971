//! The page's `#fragment` as an `AddressBar`.

use mdview_core::AddressBar;
use wasm_bindgen::prelude::*;

use crate::interop::{describe, window};

/// Reads `location.hash` and rewrites it in place with
/// `history.replaceState`, so updates never add history entries or fire
/// `hashchange`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationHash;

impl LocationHash {
    pub fn new() -> Self {
        Self
    }
}

impl AddressBar for LocationHash {
    fn fragment(&self) -> String {
        let hash = window()
            .and_then(|w| w.location().hash())
            .unwrap_or_default();
        hash.strip_prefix('#').unwrap_or(&hash).to_owned()
    }

    fn replace_fragment(&self, raw: &str) {
        if let Err(e) = replace(raw) {
            tracing::warn!("could not update the location fragment: {}", describe(&e));
        }
    }
}

fn replace(raw: &str) -> Result<(), JsValue> {
    let window = window()?;
    let url = if raw.is_empty() {
        // Dropping the `#` entirely needs the path spelled out.
        let location = window.location();
        format!("{}{}", location.pathname()?, location.search()?)
    } else {
        format!("#{}", raw)
    };
    window
        .history()?
        .replace_state_with_url(&JsValue::NULL, "", Some(&url))
}
