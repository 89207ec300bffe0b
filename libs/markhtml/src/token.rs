//! Finding the marker tokens in template text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Alternatives are tried in order at each position, so the
    // content markers win over the `}}` inside of them.
    static ref TOKEN: Regex = Regex::new(
        r"(\$\{\{\}\})|(\$\{\})|(\}\})|\$\{\{([a-zA-Z][-_a-zA-Z0-9]*)\}|\$\{([a-zA-Z][-_a-zA-Z0-9]*)\}"
    ).expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'s> {
    Content,
    WrapperEnd,
    WrapperStart(&'s str),
    Plain(&'s str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'s> {
    pub kind: TokenKind<'s>,
    /// Byte offsets in the template source.
    pub start: usize,
    pub end: usize,
}

impl<'s> Token<'s> {
    /// Whether the token consumes a marker declaration.
    pub fn is_named(&self) -> bool {
        matches!(self.kind, TokenKind::WrapperStart(_) | TokenKind::Plain(_))
    }
}

/// All tokens in `src`, left to right, non-overlapping.
pub fn tokenize(src: &str) -> Vec<Token> {
    TOKEN.captures_iter(src).map(|caps| {
        let whole = caps.get(0).expect("group 0 always matches");
        let kind =
            if caps.get(1).is_some() || caps.get(2).is_some() {
                TokenKind::Content
            } else if caps.get(3).is_some() {
                TokenKind::WrapperEnd
            } else if let Some(name) = caps.get(4) {
                TokenKind::WrapperStart(name.as_str())
            } else if let Some(name) = caps.get(5) {
                TokenKind::Plain(name.as_str())
            } else {
                unreachable!("one alternative matched")
            };
        Token { kind, start: whole.start(), end: whole.end() }
    }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn t_tokenize() {
        use TokenKind::*;
        assert_eq!(kinds("<w>${{box}BEFORE${}AFTER}}</w>"),
                   [WrapperStart("box"), Content, WrapperEnd]);
        assert_eq!(kinds("${{}}${a}${b-c_2}"), [Content, Plain("a"), Plain("b-c_2")]);
        assert_eq!(kinds("${1a} $ {x} ${ x} {{y}"), []);
        assert_eq!(kinds("}}}"), [WrapperEnd]);
        let t = tokenize("ab${x}cd");
        assert_eq!((t[0].start, t[0].end), (2, 6));
    }
}
