//! Mermaid diagrams with pan/zoom, scoped to one render.
//!
//! The renderer leaves `<div class="mermaid-container"><div class="mermaid">`
//! placeholders holding escaped diagram source. After the HTML is mounted,
//! `DiagramScope::render_all` swaps each placeholder for an SVG and attaches
//! a pan/zoom controller to it. Controllers belong to the scope; starting a
//! new render (or dropping the scope) destroys them.
//!
//! `mermaid` and `svgPanZoom` are expected as page globals.

use std::cell::{Cell, RefCell};

use js_sys::{Object, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Element;

use crate::interop::{describe, document};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = mermaid, js_name = render, catch)]
    fn mermaid_render(id: &str, text: &str) -> Result<Promise, JsValue>;

    #[wasm_bindgen(js_name = svgPanZoom, catch)]
    fn svg_pan_zoom(element: &Element, options: &JsValue) -> Result<JsValue, JsValue>;
}

/// Pan/zoom limits applied to every diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanZoomOptions {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_sensitivity: f64,
}

impl Default for PanZoomOptions {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 10.0,
            zoom_sensitivity: 0.35,
        }
    }
}

impl PanZoomOptions {
    fn to_js(self) -> Result<JsValue, JsValue> {
        let options = Object::new();
        let set =
            |key: &str, value: JsValue| Reflect::set(&options, &JsValue::from_str(key), &value);
        set("minZoom", self.min_zoom.into())?;
        set("maxZoom", self.max_zoom.into())?;
        set("zoomScaleSensitivity", self.zoom_sensitivity.into())?;
        set("fit", JsValue::TRUE)?;
        set("center", JsValue::TRUE)?;
        Ok(options.into())
    }
}

/// Owns the pan/zoom controllers of the currently mounted render.
#[derive(Debug, Default)]
pub struct DiagramScope {
    options: PanZoomOptions,
    generation: Cell<u64>,
    next_id: Cell<u64>,
    controllers: RefCell<Vec<JsValue>>,
}

impl DiagramScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: PanZoomOptions) -> Self {
        let mut scope = Self::default();
        scope.options = options;
        scope
    }

    /// Number of live pan/zoom controllers.
    pub fn live(&self) -> usize {
        self.controllers.borrow().len()
    }

    /// Destroy every controller and abandon any render in flight.
    pub fn release(&self) {
        self.generation.set(self.generation.get() + 1);
        let controllers = std::mem::take(&mut *self.controllers.borrow_mut());
        for controller in controllers {
            destroy(&controller);
        }
    }

    /// Render every diagram placeholder under `container`.
    ///
    /// Returns the number of placeholders processed, or `None` when a newer
    /// render (or `release`) took over before this one finished. A diagram
    /// that fails to render is replaced by a `mermaid-error` block and still
    /// counts as processed.
    pub async fn render_all(&self, container: &Element) -> Option<usize> {
        self.release();
        let generation = self.generation.get();

        let wraps = match container.query_selector_all(".mermaid-container") {
            Ok(wraps) => wraps,
            Err(e) => {
                tracing::warn!("diagram lookup failed: {}", describe(&e));
                return Some(0);
            }
        };

        let mut processed = 0;
        for index in 0..wraps.length() {
            let Some(wrap) = wraps.item(index).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            let Ok(Some(placeholder)) = wrap.query_selector(".mermaid") else {
                continue;
            };
            let source = placeholder.text_content().unwrap_or_default();

            let id = self.next_id.get();
            self.next_id.set(id + 1);
            let rendered = render_svg(&format!("mermaid-{}", id), &source).await;
            if self.generation.get() != generation {
                tracing::debug!("diagram render superseded");
                return None;
            }

            match rendered {
                Ok(svg) => {
                    placeholder.set_outer_html(&svg);
                    self.attach_pan_zoom(&wrap);
                }
                Err(e) => {
                    let message = describe(&e);
                    tracing::warn!("diagram failed to render: {}", message);
                    if let Err(e) = show_error(&placeholder, &message) {
                        tracing::warn!("could not show diagram error: {}", describe(&e));
                    }
                }
            }
            processed += 1;
        }

        Some(processed)
    }

    fn attach_pan_zoom(&self, wrap: &Element) {
        let Ok(Some(svg)) = wrap.query_selector("svg") else {
            return;
        };
        match self.options.to_js().and_then(|options| svg_pan_zoom(&svg, &options)) {
            Ok(controller) => self.controllers.borrow_mut().push(controller),
            Err(e) => tracing::warn!("pan/zoom unavailable: {}", describe(&e)),
        }
    }
}

impl Drop for DiagramScope {
    fn drop(&mut self) {
        self.release();
    }
}

async fn render_svg(id: &str, source: &str) -> Result<String, JsValue> {
    let result = JsFuture::from(mermaid_render(id, source)?).await?;
    Reflect::get(&result, &JsValue::from_str("svg"))?
        .as_string()
        .ok_or_else(|| JsValue::from_str("mermaid returned no svg"))
}

fn show_error(placeholder: &Element, message: &str) -> Result<(), JsValue> {
    let block = document()?.create_element("div")?;
    block.set_class_name("mermaid-error");
    block.set_text_content(Some(&format!("Diagram failed to render: {}", message)));
    placeholder.replace_with_with_node_1(&block)
}

fn destroy(controller: &JsValue) {
    let result = Reflect::get(controller, &JsValue::from_str("destroy"))
        .and_then(|f| f.dyn_into::<js_sys::Function>())
        .and_then(|f| f.call0(controller));
    if let Err(e) = result {
        tracing::debug!("pan/zoom teardown failed: {}", describe(&e));
    }
}
