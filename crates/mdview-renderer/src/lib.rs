//! mdview renderer
//!
//! Turns Markdown text into the HTML the viewer shows, along with the
//! document outline. Pure and synchronous: same text in, same output out.

use markdown_weaver::{Options, Parser};
use mdview_core::{OutlineEntry, Stopwatch};

mod extract;
pub mod highlight;
mod writer;

pub use extract::extract_outline;

/// One render of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendered {
    pub html: String,
    /// Headings in document order, with the ids written into `html`.
    pub outline: Vec<OutlineEntry>,
    /// Number of diagram placeholders. Zero means diagrams are ready as soon
    /// as the HTML is attached.
    pub diagrams: usize,
}

pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_GFM
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TASKLISTS
}

pub fn render_markdown(text: &str) -> Rendered {
    let watch = Stopwatch::start("render markdown");
    let parser = Parser::new_ext(text, markdown_options());
    let rendered = writer::HtmlWriter::new(parser).finish();
    watch.finish();
    tracing::debug!(
        headings = rendered.outline.len(),
        diagrams = rendered.diagrams,
        "rendered"
    );
    rendered
}

/// HTML only.
pub fn render(text: &str) -> String {
    render_markdown(text).html
}
