//! WASM bindings for the mdview markdown viewer.
//!
//! Provides an embeddable viewer session for JavaScript/TypeScript apps.
//! The page is expected to load `mermaid`, `svgPanZoom` and `htmlToImage`
//! as globals.
//!
//! # Features
//!
//! - `syntax-highlighting`: Enable syntax highlighting for code blocks

mod types;
mod viewer;

pub use types::*;
pub use viewer::*;

use wasm_bindgen::prelude::*;

/// Initialize panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    use tracing::Level;
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    let console_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );

    let _ = set_global_default(Registry::default().with(wasm_layer));
}

/// Render markdown to HTML without a session, e.g. for previews.
#[wasm_bindgen(js_name = renderMarkdown)]
pub fn render_markdown(markdown: &str) -> String {
    mdview_renderer::render(markdown)
}
