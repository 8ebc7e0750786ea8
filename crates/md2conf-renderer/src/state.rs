//! State structs tracking context while the event stream is rendered.

use pulldown_cmark::Alignment;

/// State for tracking code block rendering.
#[derive(Default)]
pub(crate) struct CodeBlockState {
    /// Whether we're inside a code block.
    active: bool,
    /// Fence info string of the current code block.
    info: Option<String>,
    /// Buffer for code block content.
    buffer: String,
}

impl CodeBlockState {
    /// Start a new code block with optional fence info.
    pub(crate) fn start(&mut self, info: Option<String>) {
        self.active = true;
        self.info = info;
        self.buffer.clear();
    }

    /// End the current code block and return (info, content).
    pub(crate) fn end(&mut self) -> (Option<String>, String) {
        self.active = false;
        (self.info.take(), std::mem::take(&mut self.buffer))
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub(crate) fn push_newline(&mut self) {
        self.buffer.push('\n');
    }
}

/// State for tracking table rendering.
#[derive(Default)]
pub(crate) struct TableState {
    /// Whether we're inside the table header row.
    in_head: bool,
    /// Column alignments for current table.
    alignments: Vec<Alignment>,
    /// Current column index in table row.
    cell_index: usize,
}

impl TableState {
    /// Start a new table with column alignments.
    pub(crate) fn start(&mut self, alignments: Vec<Alignment>) {
        self.alignments = alignments;
        self.in_head = false;
        self.cell_index = 0;
    }

    pub(crate) fn start_head(&mut self) {
        self.in_head = true;
        self.cell_index = 0;
    }

    pub(crate) fn end_head(&mut self) {
        self.in_head = false;
    }

    pub(crate) fn start_row(&mut self) {
        self.cell_index = 0;
    }

    pub(crate) fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    pub(crate) fn is_in_head(&self) -> bool {
        self.in_head
    }

    /// Get the alignment style for the current cell.
    pub(crate) fn current_alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => r#" style="text-align:left""#,
            Some(Alignment::Center) => r#" style="text-align:center""#,
            Some(Alignment::Right) => r#" style="text-align:right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

/// State for tracking image alt text capture.
#[derive(Default)]
pub(crate) struct ImageState {
    active: bool,
    alt_text: String,
}

impl ImageState {
    pub(crate) fn start(&mut self) {
        self.active = true;
        self.alt_text.clear();
    }

    /// End image capture and return the alt text.
    pub(crate) fn end(&mut self) -> String {
        self.active = false;
        std::mem::take(&mut self.alt_text)
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.alt_text.push_str(text);
    }
}

/// A link whose text is still being collected.
pub(crate) struct PendingLink {
    /// Link destination.
    pub target: String,
    /// Link title (empty when absent).
    pub title: String,
    /// Rendered XHTML of the link text.
    pub text: String,
}

/// State for tracking headings and page title extraction.
///
/// With title extraction enabled, the first H1 becomes the page title: it is not
/// rendered, and every later heading moves up one level (H2 becomes H1, ...).
#[derive(Default)]
pub(crate) struct HeadingState {
    /// Whether to extract title from first H1.
    extract_title: bool,
    /// Extracted title from first H1.
    title: Option<String>,
    /// Whether we've seen the first H1.
    seen_first_h1: bool,
    /// Whether we're currently inside the first H1 (to capture its text).
    in_first_h1: bool,
    /// Current heading level being processed (None if not in a heading).
    current_level: Option<u8>,
    /// Buffer for title plain text.
    text: String,
    /// Buffer for heading XHTML (with inline formatting).
    html: String,
}

impl HeadingState {
    pub(crate) fn new(extract_title: bool) -> Self {
        Self {
            extract_title,
            ..Self::default()
        }
    }

    /// Check if we're currently inside a rendered heading.
    pub(crate) fn is_active(&self) -> bool {
        self.current_level.is_some()
    }

    /// Check if we're inside the first H1 being captured for title.
    pub(crate) fn is_in_first_h1(&self) -> bool {
        self.in_first_h1
    }

    /// Start tracking a heading.
    ///
    /// The first H1 is captured as the title when extraction is enabled.
    pub(crate) fn start_heading(&mut self, level: u8) {
        if self.extract_title && level == 1 && !self.seen_first_h1 {
            self.in_first_h1 = true;
            self.text.clear();
            return;
        }

        self.current_level = Some(level);
        self.html.clear();
    }

    /// Level to render, shifted up once the title has been taken from the first H1.
    pub(crate) fn adjusted_level(&self, level: u8) -> u8 {
        if self.seen_first_h1 && level > 1 {
            level - 1
        } else {
            level
        }
    }

    /// Complete the first H1 and save as title.
    pub(crate) fn complete_first_h1(&mut self) {
        self.title = Some(self.text.trim().to_owned());
        self.text.clear();
        self.in_first_h1 = false;
        self.seen_first_h1 = true;
    }

    /// Complete a rendered heading. Returns (level, html) or None if not in a heading.
    pub(crate) fn complete_heading(&mut self) -> Option<(u8, String)> {
        let level = self.current_level.take()?;
        let html = std::mem::take(&mut self.html);
        Some((self.adjusted_level(level), html))
    }

    /// Append plain text to the title buffer.
    pub(crate) fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Get the heading html buffer.
    pub(crate) fn html_buffer(&mut self) -> &mut String {
        &mut self.html
    }

    pub(crate) fn take_title(&mut self) -> Option<String> {
        self.title.take()
    }
}

/// Escape XML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
