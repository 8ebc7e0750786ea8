//! Resolution of deferred page references.
//!
//! The engine renders `[text]({{< ref "path" >}} "title")` links as markdown because
//! the destination page is only known once every page of a batch exists. This pass
//! rewrites them into `ac:link` page links.

use std::fmt::Write;

use crate::shortcode::match_shortcode;
use crate::state::escape_html;

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Maps a referenced markdown path to the title of its Confluence page.
pub trait ReferenceResolver {
    /// Page title for `path`, or `None` if the page is not known yet.
    fn resolve(&self, path: &str) -> Option<String>;
}

impl<F> ReferenceResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, path: &str) -> Option<String> {
        self(path)
    }
}

/// Result of [`resolve_references`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Page body with every resolvable reference rewritten.
    pub body: String,
    /// Referenced paths the resolver did not know, in document order.
    pub unresolved: Vec<String>,
}

/// Rewrite deferred reference links in a rendered page body.
///
/// Unresolved references are left untouched and reported in
/// [`Resolution::unresolved`].
///
/// ```
/// use md2conf_renderer::resolve_references;
///
/// let body = r#"<p>See [setup]({{< ref "setup.md" >}}).</p>"#;
/// let resolved = resolve_references(body, &|path: &str| {
///     (path == "setup.md").then(|| "Setup".to_owned())
/// });
/// assert_eq!(
///     resolved.body,
///     r#"<p>See <ac:link><ri:page ri:content-title="Setup" /><ac:plain-text-link-body><![CDATA[setup]]></ac:plain-text-link-body></ac:link>.</p>"#
/// );
/// ```
pub fn resolve_references<R>(body: &str, resolver: &R) -> Resolution
where
    R: ReferenceResolver + ?Sized,
{
    let mut out = String::with_capacity(body.len());
    let mut unresolved = Vec::new();
    // `body[..copied]` has been written to `out`.
    let mut copied = 0;
    // Link text never starts before this offset.
    let mut floor = 0;
    let mut search = 0;

    while let Some(found) = body[search..].find("](") {
        // CDATA content (code macro bodies) is copied through verbatim.
        if let Some(cdata) = body[search..search + found].find(CDATA_OPEN) {
            let content = search + cdata + CDATA_OPEN.len();
            let Some(close) = body[content..].find(CDATA_CLOSE) else {
                break;
            };
            search = content + close + CDATA_CLOSE.len();
            floor = search;
            continue;
        }

        let text_end = search + found;
        let dest_start = text_end + 2;
        search = dest_start;

        let Some(shortcode) = match_shortcode(&body[dest_start..]) else {
            continue;
        };
        let Some(tail_len) = closing_len(&body[dest_start + shortcode.len..]) else {
            continue;
        };
        let Some(text_start) = find_text_start(&body[floor..text_end]).map(|i| floor + i) else {
            continue;
        };
        let link_end = dest_start + shortcode.len + tail_len;
        search = link_end;
        floor = link_end;

        let Some(page_title) = resolver.resolve(shortcode.path) else {
            tracing::warn!(path = shortcode.path, "Unresolved page reference");
            unresolved.push(shortcode.path.to_owned());
            continue;
        };

        let text = &body[text_start + 1..text_end];
        let escaped_title = escape_html(&page_title);
        let text = if text.is_empty() { escaped_title.as_str() } else { text };
        out.push_str(&body[copied..text_start]);
        write!(
            out,
            r#"<ac:link><ri:page ri:content-title="{escaped_title}" />{}</ac:link>"#,
            link_body(text)
        )
        .unwrap();
        copied = link_end;
    }
    out.push_str(&body[copied..]);

    Resolution {
        body: out,
        unresolved,
    }
}

/// Link body for rendered link text.
///
/// Plain text goes into a CDATA plain-text body. Text with markup, or text that
/// would end the CDATA section, keeps its XHTML in a rich `ac:link-body`.
fn link_body(xhtml: &str) -> String {
    if !xhtml.contains('<') {
        let text = unescape_html(xhtml);
        if !text.contains(CDATA_CLOSE) {
            return format!("<ac:plain-text-link-body>{CDATA_OPEN}{text}{CDATA_CLOSE}</ac:plain-text-link-body>");
        }
    }
    format!("<ac:link-body>{xhtml}</ac:link-body>")
}

/// Reverse of [`escape_html`].
fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Length of `)` or ` "title")` closing a reference link.
fn closing_len(rest: &str) -> Option<usize> {
    if rest.starts_with(')') {
        return Some(1);
    }
    let title = rest.strip_prefix(" \"")?;
    let end = title.find("\")")?;
    Some(2 + end + 2)
}

/// Byte offset of the `[` opening the link text that ends at the end of `s`.
fn find_text_start(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in s.char_indices().rev() {
        match c {
            ']' => depth += 1,
            '[' if depth == 0 => return Some(idx),
            '[' => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfluenceBackend, ConvertOptions, convert};
    use pretty_assertions::assert_eq;
    use quick_xml::Reader;
    use quick_xml::events::Event;
    use std::collections::HashMap;

    fn assert_well_formed(fragment: &str) {
        let doc = format!(
            r#"<root xmlns:ac="http://atlassian.com/content" xmlns:ri="http://atlassian.com/resource/identifier">{fragment}</root>"#
        );
        let mut reader = Reader::from_str(&doc);
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => panic!("malformed fragment {fragment:?}: {err}"),
            }
        }
    }

    struct Pages(HashMap<&'static str, &'static str>);

    impl ReferenceResolver for Pages {
        fn resolve(&self, path: &str) -> Option<String> {
            self.0.get(path).map(|title| (*title).to_owned())
        }
    }

    fn pages() -> Pages {
        Pages(HashMap::from([
            ("guide/setup.md", "Setup Guide"),
            ("api.md", "API & SDK"),
        ]))
    }

    fn page_link(title: &str, text: &str) -> String {
        format!(
            r#"<ac:link><ri:page ri:content-title="{title}" /><ac:plain-text-link-body><![CDATA[{text}]]></ac:plain-text-link-body></ac:link>"#
        )
    }

    #[test]
    fn test_resolves_reference() {
        let body = r#"<p>Read [the guide]({{< ref "guide/setup.md" >}}) first.</p>"#;
        let result = resolve_references(body, &pages());
        assert_eq!(
            result.body,
            format!("<p>Read {} first.</p>", page_link("Setup Guide", "the guide"))
        );
        assert!(result.unresolved.is_empty());
    }

    #[test]
    fn test_resolves_reference_with_title() {
        let body = r#"[api]({{< relref "api.md" >}} "The API")"#;
        let result = resolve_references(body, &pages());
        assert_eq!(result.body, page_link("API &amp; SDK", "api"));
    }

    #[test]
    fn test_empty_text_uses_page_title() {
        let body = r#"[]({{< ref "guide/setup.md" >}})"#;
        let result = resolve_references(body, &pages());
        assert_eq!(result.body, page_link("Setup Guide", "Setup Guide"));
    }

    #[test]
    fn test_unresolved_left_untouched() {
        let body = r#"<p>[missing]({{< ref "nope.md" >}}) and [ok]({{< ref "api.md" >}})</p>"#;
        let result = resolve_references(body, &pages());
        assert_eq!(
            result.body,
            format!(
                r#"<p>[missing]({{{{< ref "nope.md" >}}}}) and {}</p>"#,
                page_link("API &amp; SDK", "ok")
            )
        );
        assert_eq!(result.unresolved, vec!["nope.md".to_owned()]);
    }

    #[test]
    fn test_nested_brackets_in_text() {
        let body = r#"x [see [1]]({{< ref "api.md" >}})"#;
        let result = resolve_references(body, &pages());
        assert_eq!(result.body, format!("x {}", page_link("API &amp; SDK", "see [1]")));
    }

    #[test]
    fn test_plain_links_untouched() {
        let body = "[a](b.md) and [c](https://example.com)";
        let result = resolve_references(body, &pages());
        assert_eq!(result.body, body);
        assert!(result.unresolved.is_empty());
    }

    #[test]
    fn test_closure_resolver() {
        let body = r#"[a]({{< ref "a.md" >}})"#;
        let result = resolve_references(body, &|_: &str| Some("A".to_owned()));
        assert_eq!(result.body, page_link("A", "a"));
    }

    #[test]
    fn test_code_macro_body_untouched() {
        let markdown = "```markdown\n[a]({{< ref \"a.md\" >}})\n```";
        let rendered = convert(markdown, &ConfluenceBackend::default(), ConvertOptions::default());
        let result = resolve_references(&rendered.body, &|_: &str| Some("A".to_owned()));
        assert_eq!(result.body, rendered.body);
        assert!(result.unresolved.is_empty());
        assert_well_formed(&result.body);
    }

    #[test]
    fn test_reference_after_code_macro() {
        let body = r#"<ac:plain-text-body><![CDATA[[x]({{< ref "a.md" >}})]]></ac:plain-text-body><p>[b]({{< ref "a.md" >}})</p>"#;
        let result = resolve_references(body, &|_: &str| Some("A".to_owned()));
        assert_eq!(
            result.body,
            format!(
                r#"<ac:plain-text-body><![CDATA[[x]({{{{< ref "a.md" >}}}})]]></ac:plain-text-body><p>{}</p>"#,
                page_link("A", "b")
            )
        );
    }

    #[test]
    fn test_markup_in_text_uses_rich_body() {
        let rendered = convert(
            r#"[**bold** & co]({{< ref "a.md" >}})"#,
            &ConfluenceBackend::default(),
            ConvertOptions::default(),
        );
        let result = resolve_references(&rendered.body, &|_: &str| Some("A".to_owned()));
        assert_eq!(
            result.body,
            r#"<p><ac:link><ri:page ri:content-title="A" /><ac:link-body><strong>bold</strong> &amp; co</ac:link-body></ac:link></p>"#
        );
        assert_well_formed(&result.body);
    }

    #[test]
    fn test_entities_unescaped_in_plain_body() {
        let body = r#"[a &amp; b &lt;c&gt;]({{< ref "a.md" >}})"#;
        let result = resolve_references(body, &|_: &str| Some("A".to_owned()));
        assert_eq!(result.body, page_link("A", "a & b <c>"));
    }

    #[test]
    fn test_cdata_terminator_in_text_uses_rich_body() {
        let body = r#"[[[a]]&gt;]({{< ref "a.md" >}})"#;
        let result = resolve_references(body, &|_: &str| Some("A".to_owned()));
        assert_eq!(
            result.body,
            r#"<ac:link><ri:page ri:content-title="A" /><ac:link-body>[[a]]&gt;</ac:link-body></ac:link>"#
        );
    }

    #[test]
    fn test_rendered_document_round() {
        let markdown = r#"See [setup]({{< ref "guide/setup.md" >}}) and ![x](x.png)."#;
        let rendered = convert(markdown, &ConfluenceBackend::default(), ConvertOptions::default());
        let result = resolve_references(&rendered.body, &pages());
        assert_eq!(
            result.body,
            format!(
                r#"<p>See {} and <ac:image><ri:attachment ri:filename="x.png" /></ac:image>.</p>"#,
                page_link("Setup Guide", "setup")
            )
        );
    }
}
