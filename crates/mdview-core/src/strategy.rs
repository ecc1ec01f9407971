//! Fallback tables.
//!
//! Which sources the controller tries, and in what order, depends only on a
//! document's access mode. Keeping that as data means the chain can be read
//! and tested without driving the controller.

use crate::record::AccessMode;

/// One way of getting fresh text for the current document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStep {
    /// Re-acquire through the held file reference and re-read.
    Reference,
    /// Re-read the held plain file object.
    HeldFile,
    /// Ask the user to pick the file again. Only taken when neither a
    /// reference nor a file object is held.
    Picker,
}

/// One way of producing content on startup from a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStep {
    /// Resolve the escrowed reference, check its name, re-read it.
    LiveReread,
    /// Show the fast-store text as-is.
    AdoptCached,
}

pub fn refresh_plan(mode: AccessMode) -> &'static [RefreshStep] {
    match mode {
        AccessMode::DirectAccess => &[
            RefreshStep::Reference,
            RefreshStep::HeldFile,
            RefreshStep::Picker,
        ],
        AccessMode::LegacyUpload => &[RefreshStep::HeldFile, RefreshStep::Picker],
    }
}

pub fn restore_plan(mode: AccessMode) -> &'static [RestoreStep] {
    match mode {
        AccessMode::DirectAccess => &[RestoreStep::LiveReread, RestoreStep::AdoptCached],
        AccessMode::LegacyUpload => &[RestoreStep::AdoptCached],
    }
}
