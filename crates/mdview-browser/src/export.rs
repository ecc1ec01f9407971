//! Print and image capture.
//!
//! Both assume the caller already got an `ExportRequest` from the session
//! controller, so content exists and (for images) diagrams have settled.

use js_sys::{Object, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlAnchorElement, HtmlElement};

use crate::interop::{describe, document, window};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = htmlToImage, js_name = toPng, catch)]
    fn html_to_png(node: &HtmlElement, options: &JsValue) -> Result<Promise, JsValue>;
}

/// Open the print dialog. Print styles decide what ends up on paper.
pub fn print_page() -> Result<(), String> {
    window().and_then(|w| w.print()).map_err(|e| describe(&e))
}

/// Capture `node` at its full scroll size and download it as `file_name`.
pub async fn capture_png(
    node: &HtmlElement,
    file_name: &str,
    pixel_ratio: f64,
) -> Result<(), String> {
    let data_url = render_png(node, pixel_ratio)
        .await
        .map_err(|e| describe(&e))?;
    download(&data_url, file_name).map_err(|e| describe(&e))?;
    tracing::info!(%file_name, "exported image");
    Ok(())
}

async fn render_png(node: &HtmlElement, pixel_ratio: f64) -> Result<String, JsValue> {
    let window = window()?;
    let options = Object::new();
    let set =
        |key: &str, value: JsValue| Reflect::set(&options, &JsValue::from_str(key), &value);
    set("pixelRatio", pixel_ratio.into())?;
    set("width", node.scroll_width().into())?;
    set("height", node.scroll_height().into())?;
    set("scrollX", (-window.scroll_x()?).into())?;
    set("scrollY", (-window.scroll_y()?).into())?;

    JsFuture::from(html_to_png(node, &options)?)
        .await?
        .as_string()
        .ok_or_else(|| JsValue::from_str("capture did not produce a data URL"))
}

fn download(href: &str, file_name: &str) -> Result<(), JsValue> {
    let anchor: HtmlAnchorElement = document()?.create_element("a")?.dyn_into()?;
    anchor.set_href(href);
    anchor.set_download(file_name);
    anchor.click();
    Ok(())
}
