//! Markdown nodes handed to the rendering engine.
//!
//! Nodes borrow from the parsed document and live for a single render call.

/// An image occurrence: `![alt](source "title")`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageNode<'a> {
    /// Image URI. Either an absolute URL or a file attached to the page.
    pub source: &'a str,
    /// Alternative text.
    pub alt_text: &'a str,
    /// Optional title. Not part of the storage format output.
    pub title: Option<&'a str>,
}

/// A link occurrence: `[text](target "title")`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkNode<'a> {
    /// Link destination.
    pub target: &'a str,
    /// Rendered link text, if any.
    pub display_text: Option<&'a str>,
    /// Optional title.
    pub title: Option<&'a str>,
}

/// A fenced or indented code block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CodeBlockNode<'a> {
    /// Raw code, rendered verbatim.
    pub code: &'a str,
    /// Fence info string (e.g. `python`, `mermaid`).
    pub language_tag: Option<&'a str>,
}

/// A single node the engine knows how to render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node<'a> {
    /// Image reference.
    Image(ImageNode<'a>),
    /// Hyperlink, attachment link or deferred page reference.
    Link(LinkNode<'a>),
    /// Code block or diagram.
    CodeBlock(CodeBlockNode<'a>),
    /// Any other markdown, rendered as plain XHTML.
    Generic(&'a str),
}
