//! A minimal HTML tag scanner run over the literal text while
//! compiling. It only knows enough HTML to tell where the markers
//! sit (text, start tag, attribute value, end tag) and to find the
//! end tag of every element that carries attribute markers.

use kstring::KString;

use crate::arena::LiteralArena;
use crate::error::CompileError;

const VOID_ELEMENTS: &[&[u8]] = &[
    b"area", b"base", b"basefont", b"br", b"col", b"command", b"embed",
    b"hr", b"img", b"input", b"isindex", b"keygen", b"link", b"meta",
    b"param", b"source", b"track", b"wbr",
];

const RAW_TEXT_ELEMENTS: &[&[u8]] = &[b"script", b"style"];

fn is_void(name: &[u8]) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Where an element carrying attribute markers lives in the literal
/// buffer. For void and self-closing elements the close offsets
/// equal `open_end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpan {
    pub name: KString,
    /// Offset of `<` of the start tag.
    pub open_start: u32,
    /// Offset right after `>` of the start tag.
    pub open_end: u32,
    /// Offset of `<` of the end tag.
    pub close_start: u32,
    /// Offset right after `>` of the end tag.
    pub close_end: u32,
    /// Index of the first marker after the start tag.
    pub first_inner_marker: usize,
    /// Index of the first marker after the element.
    pub next_marker: usize,
    /// Whether a wrapper's content marker lies between the tags.
    pub contains_content: bool,
}

impl ElementSpan {
    /// Literal text, markers or the content marker between the tags.
    pub fn has_content(&self) -> bool {
        self.close_start > self.open_end
            || self.next_marker > self.first_inner_marker
            || self.contains_content
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    Lt,
    LtSlash,
    TagName,
    InTag,
    Quoted(u8),
    EndTagName,
    InEndTag,
    /// After `<!`, with the number of dashes seen.
    Bang(u8),
    /// Inside `<!-- -->`, with the number of trailing dashes seen.
    Comment(u8),
    Declaration,
    /// Inside script or style, with how much of `</name` matched.
    RawText(usize),
}

#[derive(Debug)]
struct Pending {
    element: usize,
    name: Vec<u8>,
    depth: usize,
    nest: usize,
}

/// What the compiler knows at the point the scanner is fed.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    /// Number of markers emitted so far.
    pub markers: usize,
    /// Current wrapper nesting depth.
    pub depth: usize,
}

#[derive(Debug)]
pub struct Scanner {
    state: State,
    tag_start: u32,
    name: Vec<u8>,
    self_closing: bool,
    tag_element: Option<usize>,
    raw_name: Vec<u8>,
    pending: Vec<Pending>,
    elements: Vec<ElementSpan>,
}

impl Scanner {
    pub fn new() -> Self {
        Scanner {
            state: State::Text,
            tag_start: 0,
            name: Vec::new(),
            self_closing: false,
            tag_element: None,
            raw_name: Vec::new(),
            pending: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Append literal `bytes` to `arena`, following the tag structure.
    pub fn feed(
        &mut self, bytes: &[u8], arena: &mut LiteralArena, cx: Context,
    ) -> Result<(), CompileError> {
        for b in bytes {
            let pos = arena.push(*b)?;
            self.step(*b, pos, cx)?;
        }
        Ok(())
    }

    /// A marker token sits at the current position.
    pub fn interrupt(&mut self) {
        self.state = match self.state {
            State::Lt | State::LtSlash => State::Text,
            State::TagName => State::InTag,
            State::EndTagName => State::InEndTag,
            State::Bang(_) => State::Declaration,
            State::RawText(_) => State::RawText(0),
            s => s,
        };
        if self.state == State::InTag {
            self.self_closing = false;
        }
    }

    /// Between the attributes of a start tag (after `interrupt`).
    pub fn in_start_tag(&self) -> bool {
        matches!(self.state, State::TagName | State::InTag)
    }

    pub fn in_end_tag(&self) -> bool {
        matches!(self.state, State::EndTagName | State::InEndTag)
    }

    /// Anywhere inside a start or end tag, quoted values included.
    pub fn in_tag(&self) -> bool {
        self.in_start_tag() || self.in_end_tag() || matches!(self.state, State::Quoted(_))
    }

    /// Register an attribute marker in the current start tag,
    /// returning the index of its element.
    pub fn attach_attribute_marker(&mut self) -> usize {
        debug_assert!(self.in_start_tag());
        if let Some(e) = self.tag_element {
            return e
        }
        let e = self.elements.len();
        self.elements.push(ElementSpan {
            name: KString::from_ref(&String::from_utf8_lossy(&self.name)),
            open_start: self.tag_start,
            open_end: 0,
            close_start: 0,
            close_end: 0,
            first_inner_marker: 0,
            next_marker: 0,
            contains_content: false,
        });
        self.tag_element = Some(e);
        e
    }

    /// A content marker sits at the current position (in text).
    pub fn mark_content(&mut self) {
        for p in &self.pending {
            self.elements[p.element].contains_content = true;
        }
    }

    /// Called after a wrapper end lowered the depth to `depth`.
    pub fn check_depth(&self, depth: usize) -> Result<(), CompileError> {
        if let Some(p) = self.pending.iter().find(|p| p.depth > depth) {
            return Err(CompileError::WrapperCrossesElement(
                self.elements[p.element].name.clone()))
        }
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<ElementSpan>, CompileError> {
        if let Some(p) = self.pending.first() {
            return Err(CompileError::UnclosedElement(self.elements[p.element].name.clone()))
        }
        if let (Some(e), true) = (self.tag_element, self.in_tag()) {
            return Err(CompileError::UnclosedElement(self.elements[e].name.clone()))
        }
        Ok(self.elements)
    }

    fn step(&mut self, b: u8, pos: u32, cx: Context) -> Result<(), CompileError> {
        match self.state {
            State::Text => if b == b'<' {
                self.tag_start = pos;
                self.state = State::Lt;
            },
            State::Lt => match b {
                b'/' => self.state = State::LtSlash,
                b'!' => self.state = State::Bang(0),
                b'?' => self.state = State::Declaration,
                _ if b.is_ascii_alphabetic() => {
                    self.name.clear();
                    self.name.push(b.to_ascii_lowercase());
                    self.self_closing = false;
                    self.tag_element = None;
                    self.state = State::TagName;
                }
                _ => {
                    self.state = State::Text;
                    return self.step(b, pos, cx)
                }
            },
            State::LtSlash => match b {
                b'>' => self.state = State::Text,
                _ if b.is_ascii_alphabetic() => {
                    self.name.clear();
                    self.name.push(b.to_ascii_lowercase());
                    self.state = State::EndTagName;
                }
                _ => self.state = State::Declaration,
            },
            State::TagName => match b {
                b'>' => self.end_start_tag(pos, cx),
                b'/' => {
                    self.self_closing = true;
                    self.state = State::InTag;
                }
                _ if b.is_ascii_whitespace() => self.state = State::InTag,
                _ => self.name.push(b.to_ascii_lowercase()),
            },
            State::InTag => match b {
                b'>' => self.end_start_tag(pos, cx),
                b'"' | b'\'' => {
                    self.self_closing = false;
                    self.state = State::Quoted(b);
                }
                b'/' => self.self_closing = true,
                _ if b.is_ascii_whitespace() => (),
                _ => self.self_closing = false,
            },
            State::Quoted(q) => if b == q {
                self.state = State::InTag;
            },
            State::EndTagName => match b {
                b'>' => self.end_end_tag(pos, cx)?,
                _ if b.is_ascii_whitespace() => self.state = State::InEndTag,
                _ => self.name.push(b.to_ascii_lowercase()),
            },
            State::InEndTag => if b == b'>' {
                self.end_end_tag(pos, cx)?;
            },
            State::Bang(dashes) => match b {
                b'-' if dashes == 1 => self.state = State::Comment(0),
                b'-' => self.state = State::Bang(1),
                b'>' => self.state = State::Text,
                _ => self.state = State::Declaration,
            },
            State::Comment(dashes) => match b {
                b'-' => self.state = State::Comment((dashes + 1).min(2)),
                b'>' if dashes >= 2 => self.state = State::Text,
                _ => self.state = State::Comment(0),
            },
            State::Declaration => if b == b'>' {
                self.state = State::Text;
            },
            State::RawText(matched) => {
                let n = self.raw_name.len();
                self.state = match matched {
                    _ if b == b'<' => {
                        self.tag_start = pos;
                        State::RawText(1)
                    }
                    1 if b == b'/' => State::RawText(2),
                    m if m >= 2 && m - 2 < n
                        && b.to_ascii_lowercase() == self.raw_name[m - 2] =>
                        State::RawText(m + 1),
                    m if m == n + 2 && (b == b'>' || b.is_ascii_whitespace()) => {
                        self.name.clone_from(&self.raw_name);
                        if b == b'>' {
                            self.end_end_tag(pos, cx)?;
                            return Ok(())
                        }
                        State::InEndTag
                    }
                    _ => State::RawText(0),
                };
            }
        }
        Ok(())
    }

    fn end_start_tag(&mut self, pos: u32, cx: Context) {
        let open_end = pos + 1;
        let closes_itself = self.self_closing || is_void(&self.name);
        if !closes_itself {
            for p in self.pending.iter_mut().filter(|p| p.name == self.name) {
                p.nest += 1;
            }
        }
        if let Some(e) = self.tag_element.take() {
            let el = &mut self.elements[e];
            el.open_end = open_end;
            el.first_inner_marker = cx.markers;
            if closes_itself {
                el.close_start = open_end;
                el.close_end = open_end;
                el.next_marker = cx.markers;
            } else {
                self.pending.push(Pending {
                    element: e,
                    name: self.name.clone(),
                    depth: cx.depth,
                    nest: 0,
                });
            }
        }
        self.state =
            if !self.self_closing && RAW_TEXT_ELEMENTS.contains(&&*self.name) {
                self.raw_name.clone_from(&self.name);
                State::RawText(0)
            } else {
                State::Text
            };
    }

    fn end_end_tag(&mut self, pos: u32, cx: Context) -> Result<(), CompileError> {
        self.state = State::Text;
        let mut i = 0;
        while i < self.pending.len() {
            let p = &mut self.pending[i];
            if p.name != self.name {
                i += 1;
                continue
            }
            if p.nest > 0 {
                p.nest -= 1;
                i += 1;
                continue
            }
            let p = self.pending.remove(i);
            let el = &mut self.elements[p.element];
            if p.depth != cx.depth {
                return Err(CompileError::WrapperCrossesElement(el.name.clone()))
            }
            el.close_start = self.tag_start;
            el.close_end = pos + 1;
            el.next_marker = cx.markers;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CX: Context = Context { markers: 0, depth: 0 };

    // Feed `parts`, attaching an attribute marker between them.
    fn scan(parts: &[&str]) -> Result<Vec<ElementSpan>, CompileError> {
        let mut arena = LiteralArena::default();
        let mut sc = Scanner::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                sc.interrupt();
                assert!(sc.in_start_tag(), "part {i} not in a start tag");
                sc.attach_attribute_marker();
            }
            sc.feed(part.as_bytes(), &mut arena, CX)?;
        }
        sc.finish()
    }

    fn offsets(e: &ElementSpan) -> (u32, u32, u32, u32) {
        (e.open_start, e.open_end, e.close_start, e.close_end)
    }

    #[test]
    fn t_element_span() {
        //         0123456789012345678901234
        let els = scan(&["x<div", " a=\"1\">hi</div>"]).unwrap();
        assert_eq!(els.len(), 1);
        assert_eq!(els[0].name, "div");
        assert_eq!(offsets(&els[0]), (1, 12, 14, 20));
        assert!(els[0].has_content());
    }

    #[test]
    fn t_nested_same_name() {
        let src0 = "<div ";
        let src1 = "><div></div><DIV>x</Div></div>tail";
        let els = scan(&[src0, src1]).unwrap();
        let full = format!("{src0}{src1}");
        let e = &els[0];
        assert_eq!(&full[e.close_start as usize..e.close_end as usize], "</div>");
        assert_eq!(e.close_end as usize, full.len() - 4);
    }

    #[test]
    fn t_void_and_self_closing() {
        let els = scan(&["<img ", " src=x><p>"]).unwrap();
        assert!(!els[0].has_content());
        assert_eq!(els[0].close_end, els[0].open_end);
        let els = scan(&["<span ", "/>"]).unwrap();
        assert!(!els[0].has_content());
    }

    #[test]
    fn t_marker_only_content() {
        let mut arena = LiteralArena::default();
        let mut sc = Scanner::new();
        sc.feed(b"<div ", &mut arena, CX).unwrap();
        sc.interrupt();
        sc.attach_attribute_marker();
        sc.feed(b">", &mut arena, Context { markers: 1, depth: 0 }).unwrap();
        sc.interrupt();
        sc.feed(b"</div>", &mut arena, Context { markers: 2, depth: 0 }).unwrap();
        let els = sc.finish().unwrap();
        assert_eq!(els[0].close_start, els[0].open_end);
        assert_eq!((els[0].first_inner_marker, els[0].next_marker), (1, 2));
        assert!(els[0].has_content());
    }

    #[test]
    fn t_quotes_comments_raw_text() {
        let els = scan(&["<!-- <p> --><p ", " title='a>b'><script>if (a</p>b) {}</script></p>"])
            .unwrap();
        let e = &els[0];
        assert_eq!(e.open_start, 12);
        assert_eq!(e.close_end as usize,
                   "<!-- <p> --><p  title='a>b'><script>if (a</p>b) {}</script></p>".len());
    }

    #[test]
    fn t_unclosed() {
        assert_eq!(scan(&["<p ", ">never"]),
                   Err(CompileError::UnclosedElement("p".into())));
        assert_eq!(scan(&["<p ", " title=\"x"]),
                   Err(CompileError::UnclosedElement("p".into())));
    }

    #[test]
    fn t_marker_positions() {
        let mut arena = LiteralArena::default();
        let mut sc = Scanner::new();
        sc.feed(b"<a href=\"", &mut arena, CX).unwrap();
        sc.interrupt();
        assert!(sc.in_tag() && !sc.in_start_tag());
        sc.feed(b"\">text <", &mut arena, CX).unwrap();
        sc.interrupt();
        assert!(!sc.in_tag());
        sc.feed(b"></a", &mut arena, CX).unwrap();
        sc.interrupt();
        assert!(sc.in_end_tag());
    }
}
