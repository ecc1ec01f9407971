//! Active heading detection for scroll tracking.

use crate::outline::OutlineEntry;

/// The heading the reader is in: the last one, in document order, whose top
/// edge is at or above `threshold` pixels from the viewport top.
///
/// `top_of` returns the heading's offset from the viewport top, or `None`
/// when it is not laid out. Headings are in document order, so the scan
/// stops at the first one below the threshold.
pub fn active_heading<'a>(
    entries: &'a [OutlineEntry],
    threshold: f64,
    top_of: impl Fn(&str) -> Option<f64>,
) -> Option<&'a OutlineEntry> {
    let mut active = None;
    for entry in entries {
        match top_of(&entry.id) {
            Some(top) if top <= threshold => active = Some(entry),
            Some(_) => break,
            None => continue,
        }
    }
    active
}
