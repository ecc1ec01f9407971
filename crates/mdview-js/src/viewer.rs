//! JsViewer - the viewer session wrapper for JavaScript.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::HtmlElement;

use mdview_browser::{BrowserFile, BrowserPlatform, DiagramScope, capture_png, print_page};
use mdview_core::{
    ContentVersion, ExportKind, FilePicker, OpenOutcome, PLACEHOLDER_TEXT, PickedFile,
    RefreshOutcome, RestoreOutcome, SessionController, SessionPhase, SessionPlatform,
    StaleChoice, ViewerConfig,
};
use mdview_renderer::render_markdown;

use crate::types::{JsNotice, JsOutlineEntry, JsToolbar};

/// State shared between the wrapper and the futures it spawns.
struct Shared {
    session: SessionController<BrowserPlatform>,
    diagrams: DiagramScope,
    container: RefCell<Option<HtmlElement>>,
    on_change: RefCell<Option<Function>>,
    mounted: Cell<Option<ContentVersion>>,
}

impl Shared {
    /// Bring the mounted HTML up to date with the session, then tell the host.
    fn sync(self: &Rc<Self>) {
        let version = self.session.content_version();
        if self.mounted.get() != Some(version) {
            self.mount_content(version);
        }
        self.emit_change();
    }

    fn mount_content(self: &Rc<Self>, version: ContentVersion) {
        let Some(container) = self.container.borrow().clone() else {
            return;
        };
        self.mounted.set(Some(version));

        let text = self
            .session
            .document()
            .map(|doc| doc.content)
            .filter(|content| !content.is_empty());
        let Some(text) = text else {
            self.diagrams.release();
            container.set_text_content(Some(PLACEHOLDER_TEXT));
            self.session.content_rendered(version, Vec::new());
            return;
        };

        let rendered = render_markdown(&text);
        container.set_inner_html(&rendered.html);
        self.session.content_rendered(version, rendered.outline);

        if rendered.diagrams == 0 {
            self.diagrams.release();
            self.session.mark_diagrams_ready(version);
            return;
        }

        let shared = Rc::clone(self);
        spawn_local(async move {
            let finished = shared.diagrams.render_all(&container).await.is_some();
            if finished && shared.session.mark_diagrams_ready(version) {
                shared.emit_change();
            }
        });
    }

    fn emit_change(&self) {
        let Some(callback) = self.on_change.borrow().clone() else {
            return;
        };
        match serde_wasm_bindgen::to_value(&self.toolbar()) {
            Ok(value) => {
                if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                    tracing::warn!("onChange callback threw: {:?}", e);
                }
            }
            Err(e) => tracing::error!("toolbar serialization failed: {}", e),
        }
    }

    fn toolbar(&self) -> JsToolbar {
        JsToolbar::new(
            self.session.toolbar(),
            self.session.phase() == SessionPhase::StaleReady,
        )
    }
}

/// The viewer instance exposed to JavaScript.
///
/// Long-running operations return promises resolving to an outcome label.
#[wasm_bindgen]
pub struct JsViewer {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl JsViewer {
    /// Create a viewer.
    ///
    /// `config` is a partial `ViewerConfig` object (or `undefined`).
    /// `onNotice` receives `JsNotice` objects.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, on_notice: Option<Function>) -> Result<JsViewer, JsError> {
        let config: ViewerConfig = if config.is_undefined() || config.is_null() {
            ViewerConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?
        };

        let shared = Rc::new_cyclic(|weak: &Weak<Shared>| {
            let weak = weak.clone();
            let mut platform = BrowserPlatform::new(&config).with_content_hook(move |_version| {
                if let Some(shared) = weak.upgrade() {
                    shared.sync();
                }
            });
            if let Some(on_notice) = on_notice {
                platform = platform.with_notices(move |notice| {
                    let notice = JsNotice::from(notice);
                    match serde_wasm_bindgen::to_value(&notice) {
                        Ok(value) => {
                            if let Err(e) = on_notice.call1(&JsValue::NULL, &value) {
                                tracing::warn!("onNotice callback threw: {:?}", e);
                            }
                        }
                        Err(e) => tracing::error!("notice serialization failed: {}", e),
                    }
                });
            }

            Shared {
                session: SessionController::new(platform, config),
                diagrams: DiagramScope::new(),
                container: RefCell::new(None),
                on_change: RefCell::new(None),
                mounted: Cell::new(None),
            }
        });

        Ok(Self { shared })
    }

    // === Mounting ===

    /// Render into `container`. `onChange` receives a `JsToolbar` after
    /// every state change.
    #[wasm_bindgen]
    pub fn mount(&self, container: HtmlElement, on_change: Option<Function>) {
        *self.shared.container.borrow_mut() = Some(container);
        *self.shared.on_change.borrow_mut() = on_change;
        self.shared.mounted.set(None);
        self.shared.sync();
    }

    #[wasm_bindgen]
    pub fn unmount(&self) {
        self.shared.diagrams.release();
        if let Some(container) = self.shared.container.borrow_mut().take() {
            container.set_inner_html("");
        }
        *self.shared.on_change.borrow_mut() = None;
        self.shared.mounted.set(None);
    }

    // === Session ===

    /// Resume whatever the location fragment points at.
    #[wasm_bindgen]
    pub fn restore(&self) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            let outcome = shared.session.restore().await;
            shared.sync();
            Ok(JsValue::from_str(restore_label(&outcome)))
        })
    }

    /// Show the file picker and open the chosen file.
    #[wasm_bindgen]
    pub fn open(&self) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            let Some(picked) = shared.session.platform().picker().pick().await else {
                return Ok(JsValue::from_str("cancelled"));
            };
            let outcome = shared.session.open(picked, None).await;
            shared.sync();
            Ok(JsValue::from_str(open_label(&outcome)))
        })
    }

    /// Open a `File` the host already has, e.g. from a drop.
    #[wasm_bindgen(js_name = openFile)]
    pub fn open_file(&self, file: web_sys::File) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            let picked = PickedFile::upload(BrowserFile::new(file));
            let outcome = shared.session.open(picked, None).await;
            shared.sync();
            Ok(JsValue::from_str(open_label(&outcome)))
        })
    }

    #[wasm_bindgen]
    pub fn refresh(&self) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            let outcome = shared.session.refresh().await;
            shared.sync();
            Ok(JsValue::from_str(refresh_label(&outcome)))
        })
    }

    /// Answer a `stalePrompt` notice.
    #[wasm_bindgen(js_name = resolveStalePrompt)]
    pub fn resolve_stale_prompt(&self, reload: bool) -> Promise {
        let shared = Rc::clone(&self.shared);
        let choice = if reload {
            StaleChoice::ReloadLatest
        } else {
            StaleChoice::KeepCached
        };
        future_to_promise(async move {
            let outcome = shared.session.resolve_stale_prompt(choice).await;
            shared.sync();
            Ok(JsValue::from_str(outcome.as_ref().map_or("kept", refresh_label)))
        })
    }

    // === Headings ===

    /// Scroll to a heading by anchor id.
    #[wasm_bindgen]
    pub fn navigate(&self, heading_id: &str) -> bool {
        self.shared.session.navigate_to(heading_id)
    }

    /// Call from the page's scroll handler.
    #[wasm_bindgen(js_name = onScroll)]
    pub fn on_scroll(&self) -> bool {
        self.shared.session.track_scroll()
    }

    #[wasm_bindgen]
    pub fn outline(&self) -> Result<JsValue, JsError> {
        let entries: Vec<JsOutlineEntry> = self
            .shared
            .session
            .outline()
            .iter()
            .map(JsOutlineEntry::from)
            .collect();
        serde_wasm_bindgen::to_value(&entries)
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    // === Export ===

    #[wasm_bindgen(js_name = exportPdf)]
    pub fn export_pdf(&self) -> Result<(), JsError> {
        let session = &self.shared.session;
        session
            .request_export(ExportKind::Pdf)
            .map_err(|e| JsError::new(&e.to_string()))?;
        if let Err(message) = print_page() {
            session.report_export_failure(message);
        }
        Ok(())
    }

    /// Capture the mounted content as a PNG download. Resolves to whether
    /// the download was started.
    #[wasm_bindgen(js_name = exportPng)]
    pub fn export_png(&self) -> Result<Promise, JsError> {
        let request = self
            .shared
            .session
            .request_export(ExportKind::Png)
            .map_err(|e| JsError::new(&e.to_string()))?;
        let container = self
            .shared
            .container
            .borrow()
            .clone()
            .ok_or_else(|| JsError::new("Viewer is not mounted"))?;

        let shared = Rc::clone(&self.shared);
        Ok(future_to_promise(async move {
            let file_name = request.file_name.unwrap_or_default();
            let ratio = shared.session.config().png_pixel_ratio;
            match capture_png(&container, &file_name, ratio).await {
                Ok(()) => Ok(JsValue::TRUE),
                Err(message) => {
                    shared.session.report_export_failure(message);
                    Ok(JsValue::FALSE)
                }
            }
        }))
    }

    // === State ===

    #[wasm_bindgen]
    pub fn toolbar(&self) -> JsToolbar {
        self.shared.toolbar()
    }

    #[wasm_bindgen]
    pub fn phase(&self) -> String {
        phase_label(self.shared.session.phase()).to_owned()
    }

    #[wasm_bindgen(js_name = fileName)]
    pub fn file_name(&self) -> Option<String> {
        self.shared.session.document().map(|doc| doc.file_name)
    }

    #[wasm_bindgen(js_name = getMarkdown)]
    pub fn get_markdown(&self) -> String {
        self.shared
            .session
            .document()
            .map(|doc| doc.content)
            .unwrap_or_default()
    }
}

fn phase_label(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Empty => "empty",
        SessionPhase::Loading => "loading",
        SessionPhase::StaleReady => "stale",
        SessionPhase::Ready => "ready",
    }
}

fn open_label(outcome: &OpenOutcome) -> &'static str {
    match outcome {
        OpenOutcome::Opened(_) => "opened",
        OpenOutcome::ReadFailed(_) => "readFailed",
        OpenOutcome::Rejected => "rejected",
        OpenOutcome::Superseded => "superseded",
    }
}

fn refresh_label(outcome: &RefreshOutcome) -> &'static str {
    match outcome {
        RefreshOutcome::Refreshed(_) => "refreshed",
        RefreshOutcome::Reopened(_) => "reopened",
        RefreshOutcome::NothingToRefresh => "nothingToRefresh",
        RefreshOutcome::Cancelled => "cancelled",
        RefreshOutcome::Failed => "failed",
        RefreshOutcome::Superseded => "superseded",
    }
}

fn restore_label(outcome: &RestoreOutcome) -> &'static str {
    match outcome {
        RestoreOutcome::Nothing => "nothing",
        RestoreOutcome::Cached(_) => "cached",
        RestoreOutcome::Live(_) => "live",
        RestoreOutcome::Superseded => "superseded",
    }
}
