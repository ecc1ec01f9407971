//! Anchor scrolling and heading geometry.

use mdview_core::Viewport;
use web_sys::{ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition};

use crate::interop::document;

/// The live document, looked up by element id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentViewport {
    smooth: bool,
}

impl DocumentViewport {
    pub fn new() -> Self {
        Self { smooth: true }
    }

    /// Jump instead of animating. Used when restoring a position on load.
    pub fn instant() -> Self {
        Self { smooth: false }
    }

    fn element(&self, id: &str) -> Option<web_sys::Element> {
        document().ok()?.get_element_by_id(id)
    }
}

impl Viewport for DocumentViewport {
    fn scroll_to_anchor(&self, id: &str) -> bool {
        let Some(element) = self.element(id) else {
            return false;
        };

        let options = ScrollIntoViewOptions::new();
        options.set_behavior(if self.smooth {
            ScrollBehavior::Smooth
        } else {
            ScrollBehavior::Instant
        });
        options.set_block(ScrollLogicalPosition::Start);
        element.scroll_into_view_with_scroll_into_view_options(&options);
        true
    }

    fn anchor_top(&self, id: &str) -> Option<f64> {
        self.element(id)
            .map(|element| element.get_bounding_client_rect().top())
    }
}
