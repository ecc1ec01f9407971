//! Classed syntax highlighting for fenced code.
//!
//! Emits `<span class="hljs-...">` runs so one stylesheet covers every
//! language. Themes are left to CSS.

#[cfg(feature = "syntax-highlighting")]
pub fn highlight(lang: &str, code: &str) -> Option<String> {
    use std::sync::LazyLock;
    use syntect::html::{ClassStyle, ClassedHTMLGenerator};
    use syntect::parsing::SyntaxSet;
    use syntect::util::LinesWithEndings;

    static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

    let syntax = SYNTAX_SET.find_syntax_by_token(lang)?;
    let mut generator = ClassedHTMLGenerator::new_with_class_style(
        syntax,
        &SYNTAX_SET,
        ClassStyle::SpacedPrefixed { prefix: "hljs-" },
    );
    for line in LinesWithEndings::from(code) {
        if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
            tracing::debug!(lang, "highlighting gave up: {}", e);
            return None;
        }
    }
    Some(generator.finalize())
}

#[cfg(not(feature = "syntax-highlighting"))]
pub fn highlight(_lang: &str, _code: &str) -> Option<String> {
    None
}
