//! URL state codec.
//!
//! The page fragment is a list of `&`-joined segments. Two keys belong to the
//! viewer, `file=<identity>` and `heading=<anchor>`, with percent-encoded
//! values. Every other segment is carried through byte-for-byte and keeps its
//! relative order; the viewer's own segments are written first.
//!
//! Nothing else in the crate touches the raw fragment. Reads and writes go
//! through [`read_locator`] and [`update_locator`], which take an
//! [`AddressBar`] for the actual page address.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};

pub const FILE_KEY: &str = "file";
pub const HEADING_KEY: &str = "heading";

/// Raw access to the page's addressable fragment.
pub trait AddressBar {
    /// The current fragment, with or without the leading `#`.
    fn fragment(&self) -> String;

    /// Replace the fragment without adding a history entry.
    fn replace_fragment(&self, raw: &str);
}

/// Decoded fragment state.
///
/// Locators are kept normalized: an empty `file_id` or `heading_id` is the
/// same as an absent one, and empty passthrough segments are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionLocator {
    pub file_id: Option<String>,
    pub heading_id: Option<String>,
    pub other_segments: Vec<String>,
}

impl SessionLocator {
    pub fn new(file_id: Option<&str>, heading_id: Option<&str>) -> Self {
        let mut locator = Self::default();
        locator.set_file(file_id);
        locator.set_heading(heading_id);
        locator
    }

    /// Decode a raw fragment. Never fails; unknown input is passed through.
    ///
    /// If a key appears twice, the first non-empty occurrence wins and later
    /// ones are passed through untouched, until the viewer writes that key.
    pub fn decode(raw: &str) -> Self {
        let raw = raw.strip_prefix('#').unwrap_or(raw);
        let mut locator = Self::default();

        for segment in raw.split('&').filter(|s| !s.is_empty()) {
            match segment.split_once('=') {
                Some((FILE_KEY, value)) if locator.file_id.is_none() => {
                    locator.file_id = decode_value(value);
                }
                Some((HEADING_KEY, value)) if locator.heading_id.is_none() => {
                    locator.heading_id = decode_value(value);
                }
                _ => locator.other_segments.push(segment.to_owned()),
            }
        }

        locator
    }

    /// Encode to a raw fragment, without the leading `#`.
    pub fn encode(&self) -> String {
        let mut segments: Vec<Cow<'_, str>> = Vec::with_capacity(self.other_segments.len() + 2);

        if let Some(file_id) = self.file_id.as_deref().filter(|v| !v.is_empty()) {
            segments.push(format!("{}={}", FILE_KEY, urlencoding::encode(file_id)).into());
        }
        if let Some(heading_id) = self.heading_id.as_deref().filter(|v| !v.is_empty()) {
            segments.push(format!("{}={}", HEADING_KEY, urlencoding::encode(heading_id)).into());
        }
        segments.extend(
            self.other_segments
                .iter()
                .filter(|s| !s.is_empty())
                .map(|s| Cow::Borrowed(s.as_str())),
        );

        segments.join("&")
    }

    pub fn set_file(&mut self, file_id: Option<&str>) {
        self.file_id = file_id.filter(|v| !v.is_empty()).map(str::to_owned);
        self.drop_passthrough(FILE_KEY);
    }

    pub fn set_heading(&mut self, heading_id: Option<&str>) {
        self.heading_id = heading_id.filter(|v| !v.is_empty()).map(str::to_owned);
        self.drop_passthrough(HEADING_KEY);
    }

    /// Once the viewer owns `key`, stale duplicates of it must not come back
    /// on the next decode.
    fn drop_passthrough(&mut self, key: &str) {
        self.other_segments
            .retain(|segment| segment.split_once('=').is_none_or(|(k, _)| k != key));
    }
}

fn decode_value(value: &str) -> Option<String> {
    let decoded = match urlencoding::decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => {
            tracing::debug!(value, "fragment value is not valid UTF-8 once decoded, keeping raw");
            value.to_owned()
        }
    };
    (!decoded.is_empty()).then_some(decoded)
}

/// Read and decode the current page fragment.
pub fn read_locator(address: &impl AddressBar) -> SessionLocator {
    SessionLocator::decode(&address.fragment())
}

/// Apply `edit` to the decoded fragment and write it back.
///
/// Returns `false` without touching the address when the edit changes
/// nothing, so repeated identical updates never churn the URL.
pub fn update_locator(address: &impl AddressBar, edit: impl FnOnce(&mut SessionLocator)) -> bool {
    let before = read_locator(address);
    let mut after = before.clone();
    edit(&mut after);
    if after == before {
        return false;
    }
    address.replace_fragment(&after.encode());
    true
}

/// In-memory address bar for tests and headless hosts.
#[derive(Debug, Default)]
pub struct MemoryAddressBar {
    fragment: RefCell<String>,
    writes: Cell<usize>,
}

impl MemoryAddressBar {
    pub fn new(initial: &str) -> Self {
        Self {
            fragment: RefCell::new(initial.trim_start_matches('#').to_owned()),
            writes: Cell::new(0),
        }
    }

    /// Number of times the fragment has been replaced.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl AddressBar for MemoryAddressBar {
    fn fragment(&self) -> String {
        self.fragment.borrow().clone()
    }

    fn replace_fragment(&self, raw: &str) {
        *self.fragment.borrow_mut() = raw.trim_start_matches('#').to_owned();
        self.writes.set(self.writes.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(file: Option<&str>, heading: Option<&str>, others: &[&str]) -> SessionLocator {
        let mut l = SessionLocator::new(file, heading);
        l.other_segments = others.iter().map(|s| s.to_string()).collect();
        l
    }

    #[test]
    fn test_decode_recognized_and_passthrough() {
        let l = SessionLocator::decode("#view=dark&file=notes.md_1&x&heading=intro-1");
        assert_eq!(l.file_id.as_deref(), Some("notes.md_1"));
        assert_eq!(l.heading_id.as_deref(), Some("intro-1"));
        assert_eq!(l.other_segments, vec!["view=dark", "x"]);
    }

    #[test]
    fn test_round_trip_all_shapes() {
        let others: &[&[&str]] = &[&[], &["a=1"], &["z=%20q", "plain", "k=v=w"]];
        let values = [None, Some("notes.md_1700000000000"), Some("我的 笔记&x=y#")];
        for file in values {
            for heading in [None, Some("intro-1"), Some("章节 二")] {
                for other in others {
                    let original = locator(file, heading, other);
                    let decoded = SessionLocator::decode(&original.encode());
                    assert_eq!(decoded, original, "encoded as {:?}", original.encode());
                }
            }
        }
    }

    #[test]
    fn test_passthrough_is_byte_for_byte() {
        let raw = "a=%2F%2f&file=f_1&b=&c";
        let l = SessionLocator::decode(raw);
        assert_eq!(l.other_segments, vec!["a=%2F%2f", "b=", "c"]);
        assert_eq!(l.encode(), "file=f_1&a=%2F%2f&b=&c");
    }

    #[test]
    fn test_setting_one_field_leaves_the_rest() {
        let mut l = SessionLocator::decode("theme=x&file=f_1&heading=intro");
        l.set_heading(Some("usage"));
        assert_eq!(l.encode(), "file=f_1&heading=usage&theme=x");

        l.set_heading(None);
        assert_eq!(l.encode(), "file=f_1&theme=x");

        l.set_file(Some(""));
        assert_eq!(l.encode(), "theme=x");
    }

    #[test]
    fn test_duplicate_keys_pass_through_until_written() {
        let raw = "file=a_1&file=b_2&heading=&heading=intro&heading=usage";
        let mut l = SessionLocator::decode(raw);
        assert_eq!(l.file_id.as_deref(), Some("a_1"));
        assert_eq!(l.heading_id.as_deref(), Some("intro"));
        assert_eq!(l.other_segments, vec!["file=b_2", "heading=usage"]);
        assert_eq!(l.encode(), "file=a_1&heading=intro&file=b_2&heading=usage");
        assert_eq!(SessionLocator::decode(&l.encode()), l);

        l.set_file(None);
        assert_eq!(l.encode(), "heading=intro&heading=usage");
        l.set_heading(Some("setup"));
        assert_eq!(l.encode(), "heading=setup");
    }

    #[test]
    fn test_empty_values_are_absent() {
        let l = SessionLocator::decode("file=&heading=");
        assert_eq!(l, SessionLocator::default());
    }

    #[test]
    fn test_update_is_idempotent() {
        let address = MemoryAddressBar::new("#keep=1");
        assert!(update_locator(&address, |l| l.set_file(Some("a.md_1"))));
        assert!(!update_locator(&address, |l| l.set_file(Some("a.md_1"))));
        assert_eq!(address.writes(), 1);
        assert_eq!(address.fragment(), "file=a.md_1&keep=1");
    }
}
