//! HTML escaping of dynamic text.

use std::borrow::Cow;

const REPLACEMENT_CHAR: &[u8] = "\u{FFFD}".as_bytes();

fn escape_byte(b: u8) -> Option<&'static [u8]> {
    match b {
        b'&' => Some(b"&amp;"),
        b'<' => Some(b"&lt;"),
        b'>' => Some(b"&gt;"),
        b'"' => Some(b"&#34;"),
        b'\'' => Some(b"&#39;"),
        b'\0' => Some(REPLACEMENT_CHAR),
        _ => None,
    }
}

/// Append `bytes` to `out`, escaped for use in HTML text and quoted
/// attribute values.
pub fn write_escaped(out: &mut Vec<u8>, bytes: &[u8]) {
    let mut last = 0;
    for (i, b) in bytes.iter().enumerate() {
        if let Some(rep) = escape_byte(*b) {
            out.extend_from_slice(&bytes[last..i]);
            out.extend_from_slice(rep);
            last = i + 1;
        }
    }
    out.extend_from_slice(&bytes[last..]);
}

/// Append `bytes` to `out` escaping only double quotes, for
/// attribute values the caller vouches for.
pub fn write_undoublequoted(out: &mut Vec<u8>, bytes: &[u8]) {
    let mut last = 0;
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'"' {
            out.extend_from_slice(&bytes[last..i]);
            out.extend_from_slice(b"&#34;");
            last = i + 1;
        }
    }
    out.extend_from_slice(&bytes[last..]);
}

/// Escape `s`, allocating only if something needs escaping.
pub fn escape_html(s: &str) -> Cow<str> {
    match s.bytes().position(|b| escape_byte(b).is_some()) {
        None => Cow::Borrowed(s),
        Some(first) => {
            let mut out = Vec::with_capacity(s.len() + 16);
            out.extend_from_slice(&s.as_bytes()[..first]);
            write_escaped(&mut out, &s.as_bytes()[first..]);
            // Only whole ASCII bytes were replaced by UTF-8 sequences
            Cow::Owned(String::from_utf8(out).unwrap_or_else(
                |e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_escape_html() {
        assert!(matches!(escape_html("plain text"), Cow::Borrowed(_)));
        assert_eq!(escape_html("<a href=\"x\">Tom & Jerry's</a>"),
                   "&lt;a href=&#34;x&#34;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;");
        assert_eq!(escape_html("a\0b"), "a\u{FFFD}b");
        assert_eq!(escape_html("Grüße <3"), "Grüße &lt;3");
    }

    #[test]
    fn t_write_undoublequoted() {
        let mut out = Vec::new();
        write_undoublequoted(&mut out, b"say \"hi\" & <bye>");
        assert_eq!(out, b"say &#34;hi&#34; & <bye>");
    }
}
