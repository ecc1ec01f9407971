//! Outline extraction from rendered HTML.
//!
//! For hosts that receive HTML from elsewhere. HTML produced by
//! [`render_markdown`](crate::render_markdown) already carries its outline.

use std::sync::LazyLock;

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
use regex_lite::Regex;
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
use regex::Regex;

use mdview_core::{AnchorAllocator, OutlineEntry};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<h([1-6])\b([^>]*)>(.*?)</h[1-6]\s*>").unwrap());
static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\bid="([^"]*)""#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Headings in document order. Headings without an `id` get one allocated
/// from their text.
pub fn extract_outline(html: &str) -> Vec<OutlineEntry> {
    let mut anchors = AnchorAllocator::new();
    HEADING_RE
        .captures_iter(html)
        .map(|caps| {
            let level = caps[1].parse::<u8>().unwrap_or(1);
            let text = unescape(TAG_RE.replace_all(&caps[3], "").trim());
            let allocated = anchors.allocate(&text);
            let id = ID_RE
                .captures(&caps[2])
                .map(|id| unescape(&id[1]))
                .filter(|id| !id.is_empty())
                .unwrap_or(allocated);
            OutlineEntry::new(level, text, id)
        })
        .collect()
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
