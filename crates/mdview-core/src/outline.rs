//! Outline entries and heading anchor ids.
//!
//! Anchor ids are derived from heading text. When an id is already taken,
//! the heading's position among all headings (0-based) is appended, so the
//! second "Intro" in a document becomes `intro-1`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One heading in the rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// 1 through 6.
    pub level: u8,
    pub text: String,
    pub id: String,
}

impl OutlineEntry {
    pub fn new(level: u8, text: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            level: level.clamp(1, 6),
            text: text.into(),
            id: id.into(),
        }
    }
}

/// Lowercase, keep letters and digits (any script), turn whitespace, `-`
/// and `_` into single dashes, drop everything else.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }

    slug
}

/// Allocates unique anchor ids for one document, in document order.
#[derive(Debug, Default)]
pub struct AnchorAllocator {
    taken: HashSet<String>,
    position: usize,
}

impl AnchorAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, text: &str) -> String {
        let position = self.position;
        self.position += 1;

        let base = slugify(text);
        let mut candidate = if base.is_empty() {
            format!("section-{}", position)
        } else {
            base
        };
        while self.taken.contains(&candidate) {
            candidate = format!("{}-{}", candidate, position);
        }

        self.taken.insert(candidate.clone());
        candidate
    }
}
