//! Hugo-style `{{< ref "path" >}}` shortcode handling.
//!
//! Grammar, with case-insensitive keywords and anchored at the start of the input:
//!
//! ```text
//! "{{<" ws* ("ref" | "relref") ws+ '"' PATH '"' ws* ">}}"
//! ```
//!
//! `PATH` runs up to the first quote that is followed by the closing delimiter.
//! Anything after `>}}` is ignored.

use std::borrow::Cow;

const OPEN: &str = "{{<";
const CLOSE: &str = ">}}";

/// Base prefix of placeholder link destinations used while `pulldown-cmark` parses
/// the document. Extended per document until it does not occur in the source.
const PLACEHOLDER_PREFIX: &str = "md2conf-ref-";

/// A shortcode matched at the start of some input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Shortcode<'a> {
    /// The quoted path argument.
    pub path: &'a str,
    /// Number of bytes consumed, including the closing `>}}`.
    pub len: usize,
}

/// Extract the path from a `{{< ref "PATH" >}}` or `{{< relref "PATH" >}}` target.
///
/// ```
/// use md2conf_renderer::parse_reference;
///
/// assert_eq!(parse_reference(r#"{{< relref "guide/setup.md" >}}"#), Some("guide/setup.md"));
/// assert_eq!(parse_reference("guide/setup.md"), None);
/// ```
#[must_use]
pub fn parse_reference(target: &str) -> Option<&str> {
    match_shortcode(target).map(|shortcode| shortcode.path)
}

/// Match a reference shortcode at the start of `input`.
pub(crate) fn match_shortcode(input: &str) -> Option<Shortcode<'_>> {
    let mut pos = OPEN.len();
    if !input.starts_with(OPEN) {
        return None;
    }
    pos += whitespace_len(&input[pos..]);

    let keyword_len = ["relref", "ref"]
        .into_iter()
        .find(|keyword| starts_with_ignore_case(&input[pos..], keyword))
        .map(str::len)?;
    pos += keyword_len;

    let gap = whitespace_len(&input[pos..]);
    if gap == 0 {
        return None;
    }
    pos += gap;

    if !input[pos..].starts_with('"') {
        return None;
    }
    pos += 1;
    let path_start = pos;

    // Earliest quote that is followed by `ws* >}}`.
    for (offset, _) in input[path_start..].match_indices('"') {
        let quote = path_start + offset;
        let after = quote + 1;
        let close = after + whitespace_len(&input[after..]);
        if input[close..].starts_with(CLOSE) {
            return Some(Shortcode {
                path: &input[path_start..quote],
                len: close + CLOSE.len(),
            });
        }
    }
    None
}

fn whitespace_len(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Shortcode link destinations swapped out of a markdown document.
///
/// `pulldown-cmark` does not accept spaces in link destinations, so
/// `[text]({{< ref "path" >}})` would not parse as a link. Before parsing, each
/// shortcode that directly follows `](` is replaced by a placeholder destination;
/// [`restore`](Self::restore) puts the original text back.
///
/// The placeholder prefix never occurs in the source document, so author text
/// that merely looks like a placeholder is left alone.
#[derive(Debug)]
pub(crate) struct ShortcodeLinks {
    prefix: String,
    originals: Vec<String>,
}

impl Default for ShortcodeLinks {
    fn default() -> Self {
        Self::with_prefix(PLACEHOLDER_PREFIX.to_owned())
    }
}

impl ShortcodeLinks {
    fn with_prefix(prefix: String) -> Self {
        Self {
            prefix,
            originals: Vec::new(),
        }
    }

    /// Replace shortcode link destinations in `markdown` with placeholders.
    pub(crate) fn extract(markdown: &str) -> (Cow<'_, str>, Self) {
        if !markdown.contains(OPEN) {
            return (Cow::Borrowed(markdown), Self::default());
        }
        let mut links = Self::with_prefix(unused_prefix(markdown));

        let mut out = String::with_capacity(markdown.len());
        let mut rest = markdown;
        while let Some(idx) = rest.find("](") {
            let dest_start = idx + 2;
            out.push_str(&rest[..dest_start]);
            rest = &rest[dest_start..];

            let lead = whitespace_len(rest);
            if let Some(shortcode) = match_shortcode(&rest[lead..]) {
                let end = lead + shortcode.len;
                out.push_str(&rest[..lead]);
                out.push_str(&links.push(&rest[lead..end]));
                rest = &rest[end..];
            }
        }
        out.push_str(rest);

        if links.is_empty() {
            (Cow::Borrowed(markdown), links)
        } else {
            tracing::debug!(count = links.originals.len(), "Swapped shortcode link destinations");
            (Cow::Owned(out), links)
        }
    }

    fn push(&mut self, original: &str) -> String {
        let placeholder = format!("{}{}", self.prefix, self.originals.len());
        self.originals.push(original.to_owned());
        placeholder
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Put original shortcodes back in place of any placeholders in `text`.
    pub(crate) fn restore<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.is_empty() || !text.contains(&self.prefix) {
            return Cow::Borrowed(text);
        }
        // Highest index first so `md2conf-ref-1` never clobbers `md2conf-ref-10`.
        let mut restored = text.to_owned();
        for (index, original) in self.originals.iter().enumerate().rev() {
            restored = restored.replace(&format!("{}{index}", self.prefix), original);
        }
        Cow::Owned(restored)
    }
}

/// Placeholder prefix that does not occur anywhere in `markdown`.
fn unused_prefix(markdown: &str) -> String {
    let mut marks = String::new();
    loop {
        let prefix = format!("md2conf{marks}-ref-");
        if !markdown.contains(&prefix) {
            return prefix;
        }
        marks.push('x');
    }
}
