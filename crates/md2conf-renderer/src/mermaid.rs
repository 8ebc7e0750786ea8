//! Mermaid diagrams rendered by the mermaid.ink service.
//!
//! The diagram is not fetched here. It is embedded into an image URL:
//!
//! ```text
//! https://mermaid.ink/img/<base64 of {"code": "...", "mermaid": "{\"theme\":\"default\"}"}>
//! ```
//!
//! The encoded JSON becomes part of a URL, so its bytes are pinned: keys in
//! declaration order, `": "` and `", "` separators, non-ASCII escaped as `\uXXXX`.

use std::io;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

/// Base URL of the mermaid.ink image endpoint.
pub const MERMAID_INK_URL: &str = "https://mermaid.ink/img/";

/// Mermaid configuration, carried as a JSON string rather than a nested object.
const MERMAID_CONFIG: &str = r#"{"theme":"default"}"#;

/// Request payload understood by mermaid.ink.
#[derive(Serialize)]
struct Payload<'a> {
    code: &'a str,
    mermaid: &'a str,
}

/// Build the mermaid.ink image URL for a diagram.
///
/// ```
/// use md2conf_renderer::mermaid_ink_url;
///
/// let url = mermaid_ink_url("graph TD; A-->B").unwrap();
/// assert!(url.starts_with("https://mermaid.ink/img/eyJjb2RlIjog"));
/// ```
pub fn mermaid_ink_url(code: &str) -> Result<String, serde_json::Error> {
    let payload = encode_payload(code)?;
    Ok(format!("{MERMAID_INK_URL}{}", BASE64_STANDARD.encode(payload)))
}

/// Serialize the request payload to its canonical JSON bytes.
fn encode_payload(code: &str) -> Result<Vec<u8>, serde_json::Error> {
    let payload = Payload {
        code,
        mermaid: MERMAID_CONFIG,
    };
    let mut buf = Vec::with_capacity(code.len() + 64);
    let mut serializer = Serializer::with_formatter(&mut buf, SpacedAsciiFormatter);
    payload.serialize(&mut serializer)?;
    Ok(buf)
}

/// Compact JSON with a space after separators and ASCII-only output.
struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..idx])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload_string(code: &str) -> String {
        String::from_utf8(encode_payload(code).unwrap()).unwrap()
    }

    #[test]
    fn test_payload_layout() {
        assert_eq!(
            payload_string("graph TD; A-->B"),
            r#"{"code": "graph TD; A-->B", "mermaid": "{\"theme\":\"default\"}"}"#
        );
    }

    #[test]
    fn test_url_is_byte_exact() {
        assert_eq!(
            mermaid_ink_url("graph TD; A-->B").unwrap(),
            "https://mermaid.ink/img/eyJjb2RlIjogImdyYXBoIFREOyBBLS0+QiIsICJtZXJtYWlkIjogIntcInRoZW1lXCI6XCJkZWZhdWx0XCJ9In0="
        );
    }

    #[test]
    fn test_control_characters_escaped() {
        assert_eq!(
            payload_string("a\nb\t\"c\"\\\u{1}"),
            r#"{"code": "a\nb\t\"c\"\\\u0001", "mermaid": "{\"theme\":\"default\"}"}"#
        );
    }

    #[test]
    fn test_non_ascii_escaped() {
        assert_eq!(
            payload_string("A-->B[Grüße]\u{7f}"),
            r#"{"code": "A-->B[Gr\u00fc\u00dfe]\u007f", "mermaid": "{\"theme\":\"default\"}"}"#
        );
    }

    #[test]
    fn test_astral_characters_use_surrogate_pairs() {
        assert_eq!(
            payload_string("\u{1F600}"),
            r#"{"code": "\ud83d\ude00", "mermaid": "{\"theme\":\"default\"}"}"#
        );
    }

    #[test]
    fn test_slash_not_escaped() {
        assert!(payload_string("a/b").contains(r#""a/b""#));
    }
}
