//! Error types for mdview.
//!
//! None of these are fatal to a session. The controller logs them and falls
//! back to the next data source; they only surface in trait signatures so
//! platform implementations can say what went wrong.

use miette::Diagnostic;

/// Reading a local file failed.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum FileError {
    /// The bytes could not be read or decoded as text.
    #[error("could not read `{name}`: {reason}")]
    #[diagnostic(code(mdview::file::unreadable))]
    Unreadable { name: String, reason: String },

    /// The file reference was revoked, or the file moved or was deleted.
    #[error("file reference no longer resolves: {0}")]
    #[diagnostic(
        code(mdview::file::revoked),
        help("pick the file again to restore access")
    )]
    Revoked(String),
}

/// A persistence tier operation failed.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum StoreError {
    /// The host refused the write because the per-origin quota is used up.
    #[error("storage quota exceeded")]
    #[diagnostic(code(mdview::store::quota))]
    QuotaExceeded,

    /// The store could not be opened or the operation was rejected.
    #[error("storage unavailable: {0}")]
    #[diagnostic(code(mdview::store::unavailable))]
    Unavailable(String),

    /// The record could not be encoded or decoded.
    #[error(transparent)]
    #[diagnostic(code(mdview::store::serde))]
    Serde(#[from] serde_json::Error),
}

/// An export was refused or failed.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("there is no content to export")]
    #[diagnostic(code(mdview::export::empty))]
    NoContent,

    #[error("diagrams are still rendering")]
    #[diagnostic(
        code(mdview::export::pending),
        help("wait for diagram rendering to finish")
    )]
    DiagramsPending,

    #[error("export failed: {0}")]
    #[diagnostic(code(mdview::export::failed))]
    Failed(String),
}
