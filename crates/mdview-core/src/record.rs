//! Document records, the unit stored in the fast tier.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How a document was obtained.
///
/// Serialized as a boolean: `true` for `DirectAccess`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// A live, re-readable file reference exists.
    DirectAccess,
    /// Only a snapshot of the text exists; re-reading needs a new pick.
    #[default]
    LegacyUpload,
}

impl AccessMode {
    pub fn from_reference(has_reference: bool) -> Self {
        if has_reference {
            Self::DirectAccess
        } else {
            Self::LegacyUpload
        }
    }

    pub fn is_direct(self) -> bool {
        matches!(self, Self::DirectAccess)
    }
}

impl Serialize for AccessMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.is_direct())
    }
}

impl<'de> Deserialize<'de> for AccessMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bool::deserialize(deserializer).map(Self::from_reference)
    }
}

/// One opened document. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub file_name: String,
    pub content: String,
    pub access_mode: AccessMode,
}

impl DocumentRecord {
    pub fn new(
        file_name: impl Into<String>,
        content: impl Into<String>,
        access_mode: AccessMode,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            access_mode,
        }
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
