//! Document identities.
//!
//! An identity names one "open" action, not one file: opening `a.md` twice
//! yields two identities, refreshing keeps the one you have.

use std::cell::Cell;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};
use web_time::{SystemTime, UNIX_EPOCH};

/// Opaque key for one opened document, `<filename>_<created-ms>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(SmolStr);

impl DocumentId {
    pub fn from_parts(file_name: &str, created_ms: u64) -> Self {
        Self(format_smolstr!("{}_{}", file_name, created_ms))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(SmolStr::from(value))
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Hands out identities with strictly increasing timestamps, so two opens
/// inside the same millisecond still get distinct keys.
#[derive(Debug, Default)]
pub struct IdentityGenerator {
    last_ms: Cell<u64>,
}

impl IdentityGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, file_name: &str) -> DocumentId {
        self.next_at(file_name, now_ms())
    }

    pub fn next_at(&self, file_name: &str, now_ms: u64) -> DocumentId {
        let stamp = now_ms.max(self.last_ms.get() + 1);
        self.last_ms.set(stamp);
        DocumentId::from_parts(file_name, stamp)
    }
}
