//! Confluence storage format rendering engine.
//!
//! Produces the `ac:`/`ri:` fragments for the nodes that differ from plain XHTML:
//! - `ac:image` with `ri:url` (external) or `ri:attachment` (local) for images
//! - `<a>` for external links, `ac:link` to an attachment for local ones
//! - markdown passthrough for `{{< ref >}}` links, resolved in a later pass
//! - `code` structured macro for code blocks, mermaid.ink images for diagrams
//!
//! URIs and link text are emitted as given. The caller guarantees they contain
//! nothing that breaks attribute quoting or a CDATA section.

use std::fmt::Write;

use crate::mermaid::mermaid_ink_url;
use crate::node::{CodeBlockNode, ImageNode, LinkNode, Node};
use crate::renderer::{ConvertOptions, convert};
use crate::shortcode::parse_reference;
use crate::uri::has_network_authority;

/// Link body used for attachment links without text.
const ATTACHMENT_LINK_TEXT: &str = "Attachment";

/// Child page listing macro appended to index pages.
const AUTOINDEX_MACRO: &str = r#"<ac:structured-macro ac:name="children" />"#;

/// Confluence storage format rendering engine.
///
/// Stateless apart from the configured wiki URL; every method is a pure function
/// of its input and may be called concurrently.
#[derive(Clone, Debug, Default)]
pub struct ConfluenceBackend {
    confluence_url: Option<String>,
}

impl ConfluenceBackend {
    /// Create an engine for the wiki at `confluence_url`.
    #[must_use]
    pub fn new(confluence_url: Option<String>) -> Self {
        Self { confluence_url }
    }

    /// Base URL of the target wiki. Not used by the rendering rules.
    #[must_use]
    pub fn confluence_url(&self) -> Option<&str> {
        self.confluence_url.as_deref()
    }

    /// Render a single node.
    #[must_use]
    pub fn render(&self, node: &Node<'_>) -> String {
        match node {
            Node::Image(image) => self.image(image),
            Node::Link(link) => self.link(link),
            Node::CodeBlock(code) => self.code_block(code),
            Node::Generic(markdown) => self.generic(markdown),
        }
    }

    /// Render an image as an external URL or a page attachment.
    #[must_use]
    pub fn image(&self, image: &ImageNode<'_>) -> String {
        if has_network_authority(image.source) {
            external_image(image.source)
        } else {
            format!(
                r#"<ac:image><ri:attachment ri:filename="{}" /></ac:image>"#,
                image.source
            )
        }
    }

    /// Render a link.
    ///
    /// External targets become `<a>` anchors. Local `{{< ref "path" >}}` targets are
    /// returned as a markdown link for [`resolve_references`](crate::resolve_references);
    /// any other local target is a link to a page attachment.
    #[must_use]
    pub fn link(&self, link: &LinkNode<'_>) -> String {
        if has_network_authority(link.target) {
            return format!(
                r#"<a href="{}" alt="{}">{}</a>"#,
                link.target,
                link.title.unwrap_or_default(),
                link.display_text.unwrap_or(link.target)
            );
        }

        if let Some(path) = parse_reference(link.target) {
            tracing::debug!(path, "Deferring page reference");
            let mut out = format!(
                "[{}]({}",
                link.display_text.unwrap_or_default(),
                link.target
            );
            if let Some(title) = link.title {
                write!(out, r#" "{title}""#).unwrap();
            }
            out.push(')');
            return out;
        }

        format!(
            r#"<ac:link><ri:attachment ri:filename="{}" /><ac:plain-text-link-body><![CDATA[{}]]></ac:plain-text-link-body></ac:link>"#,
            link.target,
            link.display_text.unwrap_or(ATTACHMENT_LINK_TEXT)
        )
    }

    /// Render a code block as a `code` macro, or a mermaid diagram as an image.
    #[must_use]
    pub fn code_block(&self, block: &CodeBlockNode<'_>) -> String {
        if block.language_tag.is_some_and(|tag| tag.contains("mermaid")) {
            match mermaid_ink_url(block.code) {
                Ok(src) => return format!("\n{}\n", external_image(&src)),
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to encode mermaid diagram, rendering as code");
                }
            }
        }

        let language = block.language_tag.map(str::trim).unwrap_or_default();
        let mut out = String::with_capacity(block.code.len() + 512);
        out.push_str("\n<ac:structured-macro ac:name=\"code\">");
        for (name, value) in [
            ("title", ""),
            ("theme", "Emacs"),
            ("linenumbers", "true"),
            ("language", language),
            ("firstline", "0001"),
            ("collapse", "false"),
        ] {
            write!(
                out,
                r#"<ac:parameter ac:name="{name}">{value}</ac:parameter>"#
            )
            .unwrap();
        }
        // CDATA content is not escaped
        write!(
            out,
            "<ac:plain-text-body><![CDATA[{}]]></ac:plain-text-body>",
            block.code
        )
        .unwrap();
        out.push_str("</ac:structured-macro>\n");
        out
    }

    /// Child page listing macro for index pages.
    #[must_use]
    pub fn autoindex(&self) -> &'static str {
        AUTOINDEX_MACRO
    }

    /// Render arbitrary markdown with the baseline XHTML rules.
    fn generic(&self, markdown: &str) -> String {
        convert(markdown, self, ConvertOptions::default()).body
    }
}

fn external_image(src: &str) -> String {
    format!(r#"<ac:image><ri:url ri:value="{src}" /></ac:image>"#)
}
