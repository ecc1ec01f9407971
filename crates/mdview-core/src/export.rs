//! Export gating and file naming.

use chrono::DateTime;

use crate::error::ExportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Hand the page to the print dialog.
    Pdf,
    /// Capture the content node as an image.
    Png,
}

/// A go-ahead for the export pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub kind: ExportKind,
    /// Suggested download name. `None` for print, which names nothing.
    pub file_name: Option<String>,
}

/// Whether an export may run now.
///
/// Printing only needs content. Image capture additionally needs every
/// diagram in the current render to have settled, otherwise the capture
/// would show placeholders.
pub fn check_export(
    kind: ExportKind,
    has_content: bool,
    diagrams_ready: bool,
) -> Result<(), ExportError> {
    if !has_content {
        return Err(ExportError::NoContent);
    }
    if kind == ExportKind::Png && !diagrams_ready {
        return Err(ExportError::DiagramsPending);
    }
    Ok(())
}

/// The document name without its `.md` suffix, or `markdown`.
pub fn export_base_name(file_name: &str) -> &str {
    let trimmed = match file_name.len().checked_sub(3) {
        Some(cut)
            if file_name.is_char_boundary(cut)
                && file_name[cut..].eq_ignore_ascii_case(".md") =>
        {
            &file_name[..cut]
        }
        _ => file_name,
    };
    if trimmed.is_empty() {
        "markdown"
    } else {
        trimmed
    }
}

/// `<base>_<YYYY-MM-DDTHH-MM-SS>.png`, in UTC.
pub fn png_file_name(file_name: &str, now_ms: u64) -> String {
    let stamp = DateTime::from_timestamp_millis(now_ms as i64)
        .map(|t| t.format("%Y-%m-%dT%H-%M-%S").to_string())
        .unwrap_or_else(|| "1970-01-01T00-00-00".to_owned());
    format!("{}_{}.png", export_base_name(file_name), stamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_needs_diagrams() {
        assert_eq!(
            check_export(ExportKind::Png, true, false),
            Err(ExportError::DiagramsPending)
        );
        assert_eq!(check_export(ExportKind::Png, true, true), Ok(()));
        assert_eq!(check_export(ExportKind::Pdf, true, false), Ok(()));
        assert_eq!(
            check_export(ExportKind::Pdf, false, true),
            Err(ExportError::NoContent)
        );
    }

    #[test]
    fn test_base_name() {
        assert_eq!(export_base_name("notes.md"), "notes");
        assert_eq!(export_base_name("NOTES.MD"), "NOTES");
        assert_eq!(export_base_name("archive.md.txt"), "archive.md.txt");
        assert_eq!(export_base_name(".md"), "markdown");
        assert_eq!(export_base_name(""), "markdown");
        assert_eq!(export_base_name("笔记.md"), "笔记");
    }

    #[test]
    fn test_png_file_name() {
        // 2024-03-05T06:07:08.900Z
        assert_eq!(
            png_file_name("notes.md", 1_709_618_828_900),
            "notes_2024-03-05T06-07-08.png"
        );
    }
}
