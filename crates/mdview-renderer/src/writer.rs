//! Event stream to HTML for the viewer.
//!
//! Differs from a stock CommonMark writer in four ways: raw HTML in the
//! source is escaped instead of passed through, headings get outline anchor
//! ids, fenced code is highlighted, and `mermaid` fences become diagram
//! placeholders for the browser to fill in.

use std::collections::HashMap;
use std::fmt;

use markdown_weaver::{
    Alignment, BlockQuoteKind, CodeBlockKind, CowStr, Event, Event::*, LinkType, Tag, TagEnd,
};
use markdown_weaver_escape::{
    FmtWriter, StrWrite, escape_href, escape_html, escape_html_body_text,
};
use mdview_core::{AnchorAllocator, OutlineEntry};

use crate::Rendered;
use crate::highlight::highlight;

enum TableState {
    Head,
    Body,
}

enum FenceKind {
    Diagram,
    Source(Option<String>),
}

struct HeadingCapture {
    level: u8,
    /// Where the heading's inner HTML starts in the output.
    start: usize,
    text: String,
}

pub(crate) struct HtmlWriter<'a, I> {
    iter: I,
    writer: FmtWriter<String>,

    /// Whether or not the last write wrote a newline.
    end_newline: bool,

    /// Inside a metadata block (text should not be written)
    in_non_writing_block: bool,

    table_state: TableState,
    table_alignments: Vec<Alignment>,
    table_cell_index: usize,
    numbers: HashMap<CowStr<'a>, usize>,

    fence: Option<(FenceKind, String)>,
    heading: Option<HeadingCapture>,
    anchors: AnchorAllocator,
    outline: Vec<OutlineEntry>,
    diagrams: usize,
}

impl<'a, I> HtmlWriter<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    pub(crate) fn new(iter: I) -> Self {
        Self {
            iter,
            writer: FmtWriter(String::new()),
            end_newline: true,
            in_non_writing_block: false,
            table_state: TableState::Head,
            table_alignments: vec![],
            table_cell_index: 0,
            numbers: HashMap::new(),
            fence: None,
            heading: None,
            anchors: AnchorAllocator::new(),
            outline: Vec::new(),
            diagrams: 0,
        }
    }

    pub(crate) fn finish(mut self) -> Rendered {
        if let Err(e) = self.run() {
            tracing::error!("html output interrupted: {}", e);
        }
        Rendered {
            html: self.writer.0,
            outline: self.outline,
            diagrams: self.diagrams,
        }
    }

    #[inline]
    fn write_newline(&mut self) -> fmt::Result {
        self.end_newline = true;
        self.writer.write_str("\n")
    }

    #[inline]
    fn write(&mut self, s: &str) -> fmt::Result {
        self.writer.write_str(s)?;

        if !s.is_empty() {
            self.end_newline = s.ends_with('\n');
        }
        Ok(())
    }

    /// Newline first unless the output already ends with one.
    fn block(&mut self, s: &str) -> fmt::Result {
        if !self.end_newline {
            self.write_newline()?;
        }
        self.write(s)
    }

    fn capture_text(&mut self, text: &str) {
        if let Some(heading) = self.heading.as_mut() {
            heading.text.push_str(text);
        }
    }

    fn run(&mut self) -> fmt::Result {
        while let Some(event) = self.iter.next() {
            match event {
                Start(tag) => self.start_tag(tag)?,
                End(tag) => self.end_tag(tag)?,
                Text(text) => {
                    if let Some((_, buffer)) = self.fence.as_mut() {
                        buffer.push_str(&text);
                    } else if !self.in_non_writing_block {
                        self.capture_text(&text);
                        escape_html_body_text(&mut self.writer, &text)?;
                        self.end_newline = text.ends_with('\n');
                    }
                }
                Code(text) => {
                    self.capture_text(&text);
                    self.write("<code>")?;
                    escape_html_body_text(&mut self.writer, &text)?;
                    self.write("</code>")?;
                }
                InlineMath(text) | DisplayMath(text) => {
                    self.capture_text(&text);
                    escape_html_body_text(&mut self.writer, &text)?;
                }
                // Never trust markup from the document.
                Html(html) | InlineHtml(html) => {
                    if !self.in_non_writing_block {
                        self.capture_text(&html);
                        escape_html_body_text(&mut self.writer, &html)?;
                        self.end_newline = html.ends_with('\n');
                    }
                }
                SoftBreak => {
                    self.capture_text(" ");
                    self.write_newline()?;
                }
                HardBreak => {
                    self.capture_text(" ");
                    self.write("<br />\n")?;
                }
                Rule => self.block("<hr />\n")?,
                FootnoteReference(name) => {
                    let len = self.numbers.len() + 1;
                    self.write("<sup class=\"footnote-reference\"><a href=\"#")?;
                    escape_html(&mut self.writer, &name)?;
                    self.write("\">")?;
                    let number = *self.numbers.entry(name).or_insert(len);
                    write!(&mut self.writer, "{}", number)?;
                    self.write("</a></sup>")?;
                }
                TaskListMarker(true) => {
                    self.write("<input disabled=\"\" type=\"checkbox\" checked=\"\"/>\n")?;
                }
                TaskListMarker(false) => {
                    self.write("<input disabled=\"\" type=\"checkbox\"/>\n")?;
                }
                WeaverBlock(_) => {}
            }
        }
        Ok(())
    }

    fn start_tag(&mut self, tag: Tag<'a>) -> fmt::Result {
        match tag {
            // Raw HTML blocks render as escaped paragraphs.
            Tag::HtmlBlock | Tag::Paragraph => self.block("<p>"),
            Tag::Heading { level, .. } => {
                if !self.end_newline {
                    self.write_newline()?;
                }
                self.heading = Some(HeadingCapture {
                    level: level as u8,
                    start: self.writer.0.len(),
                    text: String::new(),
                });
                Ok(())
            }
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                self.write("<table>")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                self.write("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                self.write("<tr>")
            }
            Tag::TableCell => {
                match self.table_state {
                    TableState::Head => self.write("<th")?,
                    TableState::Body => self.write("<td")?,
                }
                match self.table_alignments.get(self.table_cell_index) {
                    Some(&Alignment::Left) => self.write(" style=\"text-align: left\">"),
                    Some(&Alignment::Center) => self.write(" style=\"text-align: center\">"),
                    Some(&Alignment::Right) => self.write(" style=\"text-align: right\">"),
                    _ => self.write(">"),
                }
            }
            Tag::BlockQuote(kind) => {
                let class_str = match kind {
                    None => "",
                    Some(BlockQuoteKind::Note) => " class=\"markdown-alert-note\"",
                    Some(BlockQuoteKind::Tip) => " class=\"markdown-alert-tip\"",
                    Some(BlockQuoteKind::Important) => " class=\"markdown-alert-important\"",
                    Some(BlockQuoteKind::Warning) => " class=\"markdown-alert-warning\"",
                    Some(BlockQuoteKind::Caution) => " class=\"markdown-alert-caution\"",
                };
                self.block(&format!("<blockquote{}>\n", class_str))
            }
            Tag::CodeBlock(info) => {
                let lang = match info {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_owned),
                    CodeBlockKind::Indented => None,
                };
                let kind = match lang {
                    Some(lang) if lang.eq_ignore_ascii_case("mermaid") => FenceKind::Diagram,
                    lang => FenceKind::Source(lang),
                };
                self.fence = Some((kind, String::new()));
                Ok(())
            }
            Tag::List(Some(1)) => self.block("<ol>\n"),
            Tag::List(Some(start)) => {
                self.block("<ol start=\"")?;
                write!(&mut self.writer, "{}", start)?;
                self.write("\">\n")
            }
            Tag::List(None) => self.block("<ul>\n"),
            Tag::Item => self.block("<li>"),
            Tag::DefinitionList => self.block("<dl>\n"),
            Tag::DefinitionListTitle => self.block("<dt>"),
            Tag::DefinitionListDefinition => self.block("<dd>"),
            Tag::Subscript => self.write("<sub>"),
            Tag::Superscript => self.write("<sup>"),
            Tag::Emphasis => self.write("<em>"),
            Tag::Strong => self.write("<strong>"),
            Tag::Strikethrough => self.write("<del>"),
            Tag::Link {
                link_type: LinkType::Email,
                dest_url,
                title,
                id: _,
            } => {
                self.write("<a href=\"mailto:")?;
                escape_href(&mut self.writer, &dest_url)?;
                self.link_title(&title)
            }
            Tag::Link {
                link_type: _,
                dest_url,
                title,
                id: _,
            }
            | Tag::Embed {
                embed_type: _,
                dest_url,
                title,
                id: _,
                attrs: _,
            } => {
                self.write("<a href=\"")?;
                escape_href(&mut self.writer, &dest_url)?;
                self.link_title(&title)
            }
            Tag::Image {
                link_type: _,
                dest_url,
                title,
                id: _,
                attrs: _,
            } => {
                self.write("<img src=\"")?;
                escape_href(&mut self.writer, &dest_url)?;
                self.write("\" alt=\"")?;
                self.raw_text()?;
                if !title.is_empty() {
                    self.write("\" title=\"")?;
                    escape_html(&mut self.writer, &title)?;
                }
                self.write("\" />")
            }
            Tag::FootnoteDefinition(name) => {
                self.block("<div class=\"footnote-definition\" id=\"")?;
                escape_html(&mut self.writer, &name)?;
                self.write("\"><sup class=\"footnote-definition-label\">")?;
                let len = self.numbers.len() + 1;
                let number = *self.numbers.entry(name).or_insert(len);
                write!(&mut self.writer, "{}", number)?;
                self.write("</sup>")
            }
            Tag::WeaverBlock(..) | Tag::MetadataBlock(_) => {
                self.in_non_writing_block = true;
                Ok(())
            }
        }
    }

    fn link_title(&mut self, title: &str) -> fmt::Result {
        if !title.is_empty() {
            self.write("\" title=\"")?;
            escape_html(&mut self.writer, title)?;
        }
        self.write("\">")
    }

    fn end_tag(&mut self, tag: TagEnd) -> fmt::Result {
        match tag {
            TagEnd::HtmlBlock | TagEnd::Paragraph => self.write("</p>\n"),
            TagEnd::Heading(_) => self.end_heading(),
            TagEnd::Table => self.write("</tbody></table>\n"),
            TagEnd::TableHead => {
                self.table_state = TableState::Body;
                self.write("</tr></thead><tbody>\n")
            }
            TagEnd::TableRow => self.write("</tr>\n"),
            TagEnd::TableCell => {
                match self.table_state {
                    TableState::Head => self.write("</th>")?,
                    TableState::Body => self.write("</td>")?,
                }
                self.table_cell_index += 1;
                Ok(())
            }
            TagEnd::BlockQuote(_) => self.write("</blockquote>\n"),
            TagEnd::CodeBlock => self.end_fence(),
            TagEnd::List(true) => self.write("</ol>\n"),
            TagEnd::List(false) => self.write("</ul>\n"),
            TagEnd::Item => self.write("</li>\n"),
            TagEnd::DefinitionList => self.write("</dl>\n"),
            TagEnd::DefinitionListTitle => self.write("</dt>\n"),
            TagEnd::DefinitionListDefinition => self.write("</dd>\n"),
            TagEnd::Emphasis => self.write("</em>"),
            TagEnd::Superscript => self.write("</sup>"),
            TagEnd::Subscript => self.write("</sub>"),
            TagEnd::Strong => self.write("</strong>"),
            TagEnd::Strikethrough => self.write("</del>"),
            TagEnd::Link | TagEnd::Embed => self.write("</a>"),
            TagEnd::Image => Ok(()), // consumed by raw_text
            TagEnd::FootnoteDefinition => self.write("</div>\n"),
            TagEnd::WeaverBlock(_) | TagEnd::MetadataBlock(_) => {
                self.in_non_writing_block = false;
                Ok(())
            }
        }
    }

    /// Wrap the buffered heading HTML now that its text, and so its id, is
    /// known.
    fn end_heading(&mut self) -> fmt::Result {
        let Some(heading) = self.heading.take() else {
            return Ok(());
        };
        let inner = self.writer.0.split_off(heading.start);
        let text = heading.text.trim();
        let id = self.anchors.allocate(text);

        write!(&mut self.writer, "<h{} id=\"", heading.level)?;
        escape_html(&mut self.writer, &id)?;
        self.write("\">")?;
        self.write(&inner)?;
        write!(&mut self.writer, "</h{}>", heading.level)?;
        self.write_newline()?;

        self.outline.push(OutlineEntry::new(heading.level, text, id));
        Ok(())
    }

    fn end_fence(&mut self) -> fmt::Result {
        let Some((kind, buffer)) = self.fence.take() else {
            return Ok(());
        };
        if !self.end_newline {
            self.write_newline()?;
        }

        match kind {
            FenceKind::Diagram => {
                self.diagrams += 1;
                self.write("<div class=\"mermaid-container\"><div class=\"mermaid\">")?;
                escape_html_body_text(&mut self.writer, &buffer)?;
                self.write("</div></div>\n")
            }
            FenceKind::Source(Some(lang)) => {
                self.write("<pre class=\"hljs\"><code class=\"language-")?;
                escape_html(&mut self.writer, &lang)?;
                self.write("\">")?;
                match highlight(&lang, &buffer) {
                    Some(highlighted) => self.write(&highlighted)?,
                    None => escape_html_body_text(&mut self.writer, &buffer)?,
                }
                self.write("</code></pre>\n")
            }
            FenceKind::Source(None) => {
                self.write("<pre class=\"hljs\"><code>")?;
                escape_html_body_text(&mut self.writer, &buffer)?;
                self.write("</code></pre>\n")
            }
        }
    }

    // run raw text, consuming end tag
    fn raw_text(&mut self) -> fmt::Result {
        let mut nest = 0;
        while let Some(event) = self.iter.next() {
            match event {
                Start(_) => nest += 1,
                End(_) => {
                    if nest == 0 {
                        break;
                    }
                    nest -= 1;
                }
                Html(text) | InlineHtml(text) | Code(text) | Text(text) | InlineMath(text)
                | DisplayMath(text) => {
                    // alt attribute, not body text
                    escape_html(&mut self.writer, &text)?;
                    self.end_newline = text.ends_with('\n');
                }
                SoftBreak | HardBreak | Rule => self.write(" ")?,
                FootnoteReference(name) => {
                    let len = self.numbers.len() + 1;
                    let number = *self.numbers.entry(name).or_insert(len);
                    write!(&mut self.writer, "[{}]", number)?;
                }
                TaskListMarker(true) => self.write("[x]")?,
                TaskListMarker(false) => self.write("[ ]")?,
                WeaverBlock(_) => {}
            }
        }
        Ok(())
    }
}
