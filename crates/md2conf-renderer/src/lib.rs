//! Markdown to Confluence storage format renderer.
//!
//! The crate is split in two layers:
//!
//! - [`ConfluenceBackend`]: the rendering engine. Maps one [`Node`] (image, link,
//!   code block) to a storage format fragment. Every operation is a pure function
//!   of its input.
//! - [`MarkdownRenderer`]: drives the engine from a `pulldown-cmark` event stream and
//!   renders every other construct (paragraphs, lists, tables, ...) as plain XHTML.
//!
//! Links to other markdown pages written as `{{< ref "path" >}}` shortcodes are not
//! resolved during rendering. They are emitted as markdown links and resolved in a
//! second pass with [`resolve_references`] once page titles are known.
//!
//! # Example
//!
//! ```
//! use md2conf_renderer::{ConfluenceBackend, ConvertOptions, convert};
//!
//! let backend = ConfluenceBackend::new(None);
//! let options = ConvertOptions {
//!     extract_title: true,
//!     ..ConvertOptions::default()
//! };
//! let result = convert("# Title\n\n![logo](logo.png)", &backend, options);
//! assert_eq!(result.title.as_deref(), Some("Title"));
//! assert_eq!(
//!     result.body,
//!     r#"<p><ac:image><ri:attachment ri:filename="logo.png" /></ac:image></p>"#
//! );
//! ```

mod confluence;
mod mermaid;
mod node;
mod references;
mod renderer;
mod shortcode;
mod state;
mod uri;
mod util;

pub use confluence::ConfluenceBackend;
pub use mermaid::{MERMAID_INK_URL, mermaid_ink_url};
pub use node::{CodeBlockNode, ImageNode, LinkNode, Node};
pub use references::{ReferenceResolver, Resolution, resolve_references};
pub use renderer::{ConvertOptions, MarkdownRenderer, RenderResult, convert};
pub use shortcode::parse_reference;
pub use state::escape_html;
pub use uri::has_network_authority;
