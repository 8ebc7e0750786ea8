//! Markdown document renderer driving [`ConfluenceBackend`].

use std::borrow::Cow;
use std::fmt::Write;

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag, TagEnd};

use crate::confluence::ConfluenceBackend;
use crate::node::{CodeBlockNode, ImageNode, LinkNode};
use crate::shortcode::ShortcodeLinks;
use crate::state::{CodeBlockState, HeadingState, ImageState, PendingLink, TableState, escape_html};
use crate::util::heading_level_to_num;

/// Result of rendering a markdown document.
#[derive(Clone, Debug)]
pub struct RenderResult {
    /// Confluence storage format page body.
    pub body: String,
    /// Title extracted from first H1 heading (if title extraction was enabled).
    pub title: Option<String>,
}

/// Document-level rendering options for [`convert`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ConvertOptions {
    /// Take the page title from the first H1 instead of rendering it.
    pub extract_title: bool,
    /// Append the child page listing macro.
    pub autoindex: bool,
}

/// Markdown extensions understood by the renderer.
fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
}

/// Convert a markdown document to a Confluence storage format page body.
///
/// Handles `[text]({{< ref "path" >}})` links, which `pulldown-cmark` would otherwise
/// reject because of the spaces in the destination.
#[must_use]
pub fn convert(markdown: &str, backend: &ConfluenceBackend, options: ConvertOptions) -> RenderResult {
    let (source, links) = ShortcodeLinks::extract(markdown);
    let parser = Parser::new_ext(&source, parser_options());

    let mut renderer = MarkdownRenderer::new(backend).with_shortcode_links(links);
    if options.extract_title {
        renderer = renderer.with_title_extraction();
    }
    if options.autoindex {
        renderer = renderer.with_autoindex();
    }
    renderer.render(parser)
}

/// Markdown renderer producing Confluence storage format.
///
/// Images, links and code blocks are collected into nodes and rendered by the
/// [`ConfluenceBackend`]. Everything else (paragraphs, lists, tables, inline
/// formatting) is emitted as plain XHTML.
///
/// # Example
///
/// ```
/// use pulldown_cmark::Parser;
/// use md2conf_renderer::{ConfluenceBackend, MarkdownRenderer};
///
/// let backend = ConfluenceBackend::default();
/// let result = MarkdownRenderer::new(&backend)
///     .with_title_extraction()
///     .render(Parser::new("# Hello\n\n**Bold** text"));
/// assert_eq!(result.title.as_deref(), Some("Hello"));
/// assert_eq!(result.body, "<p><strong>Bold</strong> text</p>");
/// ```
pub struct MarkdownRenderer<'b> {
    backend: &'b ConfluenceBackend,
    output: String,
    /// Code block rendering state.
    code: CodeBlockState,
    /// Table rendering state.
    table: TableState,
    /// Image alt text capture state.
    image: ImageState,
    /// Heading and title extraction state.
    heading: HeadingState,
    /// Pending image data (src, title) waiting for alt text.
    pending_image: Option<(String, String)>,
    /// Links whose text is being collected, innermost last.
    links: Vec<PendingLink>,
    /// Whether we're inside a front matter block.
    in_metadata: bool,
    /// Shortcode destinations swapped out before parsing.
    shortcodes: ShortcodeLinks,
    /// Whether to append the child page listing macro.
    autoindex: bool,
}

impl<'b> MarkdownRenderer<'b> {
    /// Create a new renderer delegating nodes to `backend`.
    #[must_use]
    pub fn new(backend: &'b ConfluenceBackend) -> Self {
        Self {
            backend,
            output: String::with_capacity(4096),
            code: CodeBlockState::default(),
            table: TableState::default(),
            image: ImageState::default(),
            heading: HeadingState::new(false),
            pending_image: None,
            links: Vec::new(),
            in_metadata: false,
            shortcodes: ShortcodeLinks::default(),
            autoindex: false,
        }
    }

    /// Enable title extraction from first H1 heading.
    ///
    /// The first H1 is not rendered and later headings are shifted up one level.
    #[must_use]
    pub fn with_title_extraction(mut self) -> Self {
        self.heading = HeadingState::new(true);
        self
    }

    /// Append the child page listing macro after the document body.
    #[must_use]
    pub fn with_autoindex(mut self) -> Self {
        self.autoindex = true;
        self
    }

    #[must_use]
    pub(crate) fn with_shortcode_links(mut self, shortcodes: ShortcodeLinks) -> Self {
        self.shortcodes = shortcodes;
        self
    }

    /// Render markdown events and return the result.
    pub fn render<'a, I>(mut self, events: I) -> RenderResult
    where
        I: Iterator<Item = Event<'a>>,
    {
        for event in events {
            self.process_event(event);
        }

        if self.autoindex {
            self.output.push_str(self.backend.autoindex());
        }

        RenderResult {
            body: self.output,
            title: self.heading.take_title(),
        }
    }

    /// Buffer receiving inline content: innermost link text, heading, or body.
    fn sink(&mut self) -> &mut String {
        match self.links.last_mut() {
            Some(link) => &mut link.text,
            None if self.heading.is_active() => self.heading.html_buffer(),
            None => &mut self.output,
        }
    }

    /// Whether inline markup is dropped (image alt text and page title are plain text).
    fn is_plain_text(&self) -> bool {
        self.image.is_active() || self.heading.is_in_first_h1()
    }

    fn push_inline(&mut self, content: &str) {
        if !self.is_plain_text() {
            self.sink().push_str(content);
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.raw_html(&html),
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => self.push_inline("<br />"),
            Event::Rule => self.output.push_str("<hr />"),
            Event::TaskListMarker(checked) => {
                self.push_inline(if checked { "[x] " } else { "[ ] " });
            }
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not supported
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => {
                // Opening tag is written in end_tag once the level is adjusted.
                self.heading.start_heading(heading_level_to_num(level));
            }
            Tag::BlockQuote(_) => self.output.push_str("<blockquote>"),
            Tag::CodeBlock(kind) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) if !info.is_empty() => Some(info.into_string()),
                    _ => None,
                };
                self.code.start(info);
            }
            Tag::List(start) => match start {
                Some(1) => self.output.push_str("<ol>"),
                Some(n) => write!(self.output, r#"<ol start="{n}">"#).unwrap(),
                None => self.output.push_str("<ul>"),
            },
            Tag::Item => self.output.push_str("<li>"),
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock => {}
            Tag::MetadataBlock(_) => self.in_metadata = true,
            Tag::DefinitionList => self.output.push_str("<dl>"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table.start(alignments);
                self.output.push_str("<table><tbody>");
            }
            Tag::TableHead => {
                self.table.start_head();
                self.output.push_str("<tr>");
            }
            Tag::TableRow => {
                self.table.start_row();
                self.output.push_str("<tr>");
            }
            Tag::TableCell => {
                let align = self.table.current_alignment_style();
                let tag = if self.table.is_in_head() { "th" } else { "td" };
                write!(self.output, "<{tag}{align}>").unwrap();
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<s>"),
            Tag::Superscript => self.push_inline("<sup>"),
            Tag::Subscript => self.push_inline("<sub>"),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let target = if link_type == LinkType::Email {
                    format!("mailto:{}", &*dest_url)
                } else {
                    self.shortcodes.restore(&dest_url).into_owned()
                };
                self.links.push(PendingLink {
                    target,
                    title: title.into_string(),
                    text: String::new(),
                });
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                // Start collecting alt text; image will be rendered in end_tag
                self.image.start();
                let source = self.shortcodes.restore(&dest_url).into_owned();
                self.pending_image = Some((source, title.into_string()));
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>"),
            TagEnd::Heading(_level) => {
                if self.heading.is_in_first_h1() {
                    self.heading.complete_first_h1();
                } else if let Some((level, html)) = self.heading.complete_heading() {
                    write!(self.output, "<h{level}>{}</h{level}>", html.trim()).unwrap();
                }
            }
            TagEnd::BlockQuote(_) => self.output.push_str("</blockquote>"),
            TagEnd::CodeBlock => {
                let (info, content) = self.code.end();
                let block = CodeBlockNode {
                    code: &content,
                    language_tag: info.as_deref(),
                };
                let rendered = self.backend.code_block(&block);
                self.output.push_str(&rendered);
            }
            TagEnd::List(ordered) => {
                self.output.push_str(if ordered { "</ol>" } else { "</ul>" });
            }
            TagEnd::Item => self.output.push_str("</li>"),
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock => {}
            TagEnd::MetadataBlock(_) => self.in_metadata = false,
            TagEnd::DefinitionList => self.output.push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>"),
            TagEnd::Table => self.output.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.output.push_str("</tr>");
                self.table.end_head();
            }
            TagEnd::TableRow => self.output.push_str("</tr>"),
            TagEnd::TableCell => {
                self.output.push_str(if self.table.is_in_head() {
                    "</th>"
                } else {
                    "</td>"
                });
                self.table.next_cell();
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link => self.end_link(),
            TagEnd::Image => self.end_image(),
        }
    }

    fn end_link(&mut self) {
        let Some(link) = self.links.pop() else {
            return;
        };
        if self.is_plain_text() {
            return;
        }
        let node = LinkNode {
            target: &link.target,
            display_text: (!link.text.is_empty()).then_some(link.text.as_str()),
            title: (!link.title.is_empty()).then_some(link.title.as_str()),
        };
        let rendered = self.backend.link(&node);
        self.sink().push_str(&rendered);
    }

    fn end_image(&mut self) {
        let alt = self.image.end();
        let Some((src, title)) = self.pending_image.take() else {
            return;
        };
        if self.heading.is_in_first_h1() {
            return;
        }
        let node = ImageNode {
            source: &src,
            alt_text: &alt,
            title: (!title.is_empty()).then_some(title.as_str()),
        };
        let rendered = self.backend.image(&node);
        self.sink().push_str(&rendered);
    }

    fn text(&mut self, text: &str) {
        if self.in_metadata {
            return;
        }
        let text = self.shortcodes.restore(text);

        // Priority: code > image > first H1 > link/heading/body
        if self.code.is_active() {
            self.code.push_str(&text);
        } else if self.image.is_active() {
            self.image.push_str(&text);
        } else if self.heading.is_in_first_h1() {
            self.heading.push_text(&text);
        } else {
            let escaped = escape_html(&text);
            self.sink().push_str(&escaped);
        }
    }

    fn inline_code(&mut self, code: &str) {
        let code = self.shortcodes.restore(code);
        if self.image.is_active() {
            self.image.push_str(&code);
        } else if self.heading.is_in_first_h1() {
            self.heading.push_text(&code);
        } else {
            let html = format!("<code>{}</code>", escape_html(&code));
            self.sink().push_str(&html);
        }
    }

    fn raw_html(&mut self, html: &str) {
        let html: Cow<'_, str> = self.shortcodes.restore(html);
        self.push_inline(&html);
    }

    fn soft_break(&mut self) {
        if self.code.is_active() {
            self.code.push_newline();
        } else if self.image.is_active() {
            self.image.push_str(" ");
        } else if self.heading.is_in_first_h1() {
            self.heading.push_text(" ");
        } else {
            self.sink().push('\n');
        }
    }
}
