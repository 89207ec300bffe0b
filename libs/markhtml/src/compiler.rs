use std::collections::HashSet;
use std::sync::Arc;

use kstring::KString;

use crate::arena::{LiteralArena, Span};
use crate::component::Template;
use crate::error::CompileError;
use crate::marker::{Action, Callback, Marker, MarkerKind, MarkerSpec};
use crate::scanner::{Context, Scanner};
use crate::token::{tokenize, TokenKind};

/// Where the content marker of a wrapper template sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ContentPoint {
    /// Index of the first marker after the content marker.
    pub marker: usize,
    /// Offset in the literal buffer.
    pub pos: u32,
}

pub(crate) struct Compiled<D> {
    pub template: Arc<Template<D>>,
    pub content: Option<ContentPoint>,
    pub max_wrapper_nesting: usize,
}

/// Compile `src` against `specs` in one left-to-right pass. With
/// `wrapper`, exactly one content marker is required, otherwise none
/// is allowed.
pub(crate) fn compile<D>(
    src: &str, specs: Vec<MarkerSpec<D>>, wrapper: bool,
) -> Result<Compiled<D>, CompileError> {
    let tokens = tokenize(src);
    let declared = specs.len();
    let found = tokens.iter().filter(|t| t.is_named()).count();
    {
        let mut names = HashSet::new();
        for spec in &specs {
            if !names.insert(spec.name.as_str()) {
                return Err(CompileError::DuplicateName(spec.name.clone()))
            }
        }
    }

    let mut specs = specs.into_iter();
    let mut arena = LiteralArena::with_capacity(src.len());
    let mut scanner = Scanner::new();
    let mut markers: Vec<Marker<D>> = Vec::with_capacity(declared);
    // Open wrapper starts, None for folded ones.
    let mut open: Vec<Option<usize>> = Vec::new();
    let mut kept_depth = 0;
    let mut max_wrapper_nesting = 0;
    let mut content = None;
    let mut seen = HashSet::new();
    let mut prefix_start = 0;
    let mut last = 0;

    for token in &tokens {
        let cx = Context { markers: markers.len(), depth: open.len() };
        scanner.feed(src[last..token.start].as_bytes(), &mut arena, cx)?;
        last = token.end;
        match token.kind {
            TokenKind::Content => {
                scanner.interrupt();
                if scanner.in_tag() {
                    return Err(CompileError::WrapperTokenInsideTag(token.start))
                }
                if content.is_some() {
                    return Err(CompileError::DuplicateContentMarker)
                }
                scanner.mark_content();
                content = Some(ContentPoint { marker: markers.len(), pos: arena.pos() });
            }
            TokenKind::WrapperEnd => {
                scanner.interrupt();
                if scanner.in_tag() {
                    return Err(CompileError::WrapperTokenInsideTag(token.start))
                }
                let start = open.pop().ok_or(CompileError::UnbalancedWrapper)?;
                scanner.check_depth(open.len())?;
                if let Some(si) = start {
                    kept_depth -= 1;
                    let end = markers.len();
                    markers.push(Marker {
                        name: markers[si].name.clone(),
                        prefix: Span::new(prefix_start, arena.pos()),
                        action: Action::WrapperEnd(si),
                    });
                    if let Action::WrapperStart(_, e) = &mut markers[si].action {
                        *e = end;
                    }
                    prefix_start = arena.pos();
                }
            }
            TokenKind::WrapperStart(name) | TokenKind::Plain(name) => {
                if !seen.insert(name) {
                    return Err(CompileError::DuplicateName(KString::from_ref(name)))
                }
                let spec = specs.next().ok_or(
                    CompileError::MarkerCountMismatch { declared, found })?;
                if spec.name.as_str() != name {
                    return Err(CompileError::NameOrderMismatch {
                        expected: spec.name,
                        found: KString::from_ref(name),
                    })
                }
                scanner.feed(spec.static_text.as_bytes(), &mut arena, cx)?;
                scanner.interrupt();

                let kind = match token.kind {
                    TokenKind::WrapperStart(_) => {
                        if scanner.in_tag() {
                            return Err(CompileError::WrapperTokenInsideTag(token.start))
                        }
                        MarkerKind::WrapperStart
                    }
                    _ if scanner.in_start_tag() => MarkerKind::Attributes,
                    _ if scanner.in_end_tag() =>
                        return Err(CompileError::MarkerInsideEndTag(spec.name)),
                    _ => MarkerKind::Plain,
                };

                let callback = match spec.callback {
                    Some(cb) => cb,
                    None => {
                        // Folded: the static text stays in the literal stream
                        if kind == MarkerKind::WrapperStart {
                            open.push(None);
                        }
                        continue
                    }
                };
                let prefix = Span::new(prefix_start, arena.pos());
                let action = match (kind, callback) {
                    (MarkerKind::Plain, Callback::Plain(f)) => Action::Plain(f),
                    (MarkerKind::Attributes, Callback::Attributes(f)) =>
                        Action::Attributes(f, scanner.attach_attribute_marker()),
                    (MarkerKind::WrapperStart, Callback::Wrapper(f)) => {
                        open.push(Some(markers.len()));
                        kept_depth += 1;
                        max_wrapper_nesting = max_wrapper_nesting.max(kept_depth);
                        // the end index is filled in at the `}}`
                        Action::WrapperStart(f, usize::MAX)
                    }
                    (kind, cb) => return Err(CompileError::CallbackKindMismatch {
                        name: spec.name,
                        kind,
                        callback: cb.kind(),
                    }),
                };
                markers.push(Marker { name: spec.name, prefix, action });
                prefix_start = arena.pos();
            }
        }
    }

    let cx = Context { markers: markers.len(), depth: open.len() };
    scanner.feed(src[last..].as_bytes(), &mut arena, cx)?;
    if !open.is_empty() {
        return Err(CompileError::UnbalancedWrapper)
    }
    let elements = scanner.finish()?;
    if specs.next().is_some() {
        return Err(CompileError::MarkerCountMismatch { declared, found })
    }
    match (wrapper, content) {
        (true, None) => return Err(CompileError::MissingContentMarker),
        (false, Some(_)) => return Err(CompileError::UnexpectedContentMarker),
        _ => (),
    }

    Ok(Compiled {
        template: Arc::new(Template { html: arena.freeze(), markers, elements }),
        content,
        max_wrapper_nesting,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::CallbackKind;

    type Spec = MarkerSpec<()>;

    fn plain(name: &'static str) -> Spec {
        Spec::plain(name, |_, _| ())
    }
    fn wrap(name: &'static str) -> Spec {
        Spec::wrapper(name, |_, _| ())
    }
    fn attrs(name: &'static str) -> Spec {
        Spec::attributes(name, |_, _| ())
    }

    fn err(src: &str, specs: Vec<Spec>, wrapper: bool) -> CompileError {
        match compile(src, specs, wrapper) {
            Ok(_) => panic!("{src:?} compiled"),
            Err(e) => e,
        }
    }

    #[test]
    fn t_literals_and_prefixes() {
        let c = compile("<a>${x}</a>${y}${z}", vec![plain("x"), plain("y"), plain("z")], false)
            .unwrap();
        let t = &c.template;
        assert_eq!(&*t.html, b"<a></a>");
        let positions: Vec<u32> = t.markers.iter().map(|m| m.position()).collect();
        assert_eq!(positions, [3, 7, 7]);
        assert_eq!(t.markers[1].prefix(), Span::new(3, 7));
        assert!(t.markers[2].prefix().is_empty());
        assert_eq!(c.max_wrapper_nesting, 0);
        assert_eq!(c.content, None);
    }

    #[test]
    fn t_wrapper_pairs_and_nesting() {
        let src = "${{a}${{b}${{c}x}}}}${{d}y}}}}";
        let c = compile(src, vec![wrap("a"), wrap("b"), wrap("c"), wrap("d")], false).unwrap();
        let m = &c.template.markers;
        let kinds: Vec<MarkerKind> = m.iter().map(|m| m.kind()).collect();
        use MarkerKind::*;
        assert_eq!(kinds, [WrapperStart, WrapperStart, WrapperStart, WrapperEnd, WrapperEnd,
                           WrapperStart, WrapperEnd, WrapperEnd]);
        assert_eq!(m[0].wrapper_end_index(), Some(7));
        assert_eq!(m[1].wrapper_end_index(), Some(4));
        assert_eq!(m[2].wrapper_end_index(), Some(3));
        assert_eq!(m[5].wrapper_end_index(), Some(6));
        assert_eq!(m[3].name(), "c");
        assert_eq!(c.max_wrapper_nesting, 3);
    }

    #[test]
    fn t_content_point() {
        let c = compile("<w>${{box}BEFORE${}AFTER}}</w>", vec![wrap("box")], true).unwrap();
        assert_eq!(c.content, Some(ContentPoint { marker: 1, pos: 9 }));
        assert_eq!(&*c.template.html, b"<w>BEFOREAFTER</w>");
        assert_eq!(c.template.markers[1].position(), 14);
    }

    #[test]
    fn t_static_and_folding() {
        let specs = vec![
            plain("a").with_static("<b>"),
            Spec::fixed("b").with_static("[B]"),
            Spec::fixed("w").with_static("<i>"),
            plain("c"),
        ];
        let c = compile("${a}|${b}|${{w}${c}}}.", specs, false).unwrap();
        let t = &c.template;
        assert_eq!(&*t.html, b"<b>|[B]|<i>.");
        assert_eq!(t.markers.len(), 2);
        assert_eq!(t.markers[0].position(), 3);
        assert_eq!(t.markers[1].name(), "c");
        assert_eq!(t.markers[1].prefix(), Span::new(3, 11));
        assert_eq!(c.max_wrapper_nesting, 0);
    }

    #[test]
    fn t_attribute_markers() {
        let c = compile("<ul><li ${a} ${b}>x</li></ul>", vec![attrs("a"), attrs("b")], false)
            .unwrap();
        let t = &c.template;
        assert_eq!(t.elements.len(), 1);
        let e = &t.elements[0];
        assert_eq!((e.open_start, e.open_end, e.close_start, e.close_end), (4, 10, 11, 16));
        assert_eq!((e.first_inner_marker, e.next_marker), (2, 2));
        assert!(e.has_content());
        assert_eq!(t.markers[1].kind(), MarkerKind::Attributes);
    }

    #[test]
    fn t_errors() {
        use CompileError::*;
        assert_eq!(err("${{a}x", vec![wrap("a")], false), UnbalancedWrapper);
        assert_eq!(err("x}}", vec![], false), UnbalancedWrapper);
        assert_eq!(err("${foo}${foo}", vec![plain("foo"), plain("foo")], false),
                   DuplicateName("foo".into()));
        assert_eq!(err("${foo}${foo}", vec![plain("foo"), plain("bar")], false),
                   DuplicateName("foo".into()));
        assert_eq!(err("${b}${a}", vec![plain("a"), plain("b")], false),
                   NameOrderMismatch { expected: "a".into(), found: "b".into() });
        assert_eq!(err("${a}${b}", vec![plain("a")], false),
                   MarkerCountMismatch { declared: 1, found: 2 });
        assert_eq!(err("${a}", vec![plain("a"), plain("b")], false),
                   MarkerCountMismatch { declared: 2, found: 1 });
        assert_eq!(err("${}", vec![], false), UnexpectedContentMarker);
        assert_eq!(err("x", vec![], true), MissingContentMarker);
        assert_eq!(err("${}${{}}", vec![], true), DuplicateContentMarker);
        assert_eq!(err("${{a}x}}", vec![plain("a")], false),
                   CallbackKindMismatch { name: "a".into(), kind: MarkerKind::WrapperStart,
                                          callback: CallbackKind::Plain });
        assert_eq!(err("<p ${a}>", vec![plain("a")], false),
                   CallbackKindMismatch { name: "a".into(), kind: MarkerKind::Attributes,
                                          callback: CallbackKind::Plain });
        assert_eq!(err("<p ${{a}}}>", vec![wrap("a")], false), WrapperTokenInsideTag(3));
        assert_eq!(err("</p ${a}>", vec![plain("a")], false), MarkerInsideEndTag("a".into()));
        assert_eq!(err("<p ${a}>x", vec![attrs("a")], false), UnclosedElement("p".into()));
        assert_eq!(err("${{w}<p ${a}>}}</p>", vec![wrap("w"), attrs("a")], false),
                   WrapperCrossesElement("p".into()));
        assert_eq!(err("<p ${a}>${{w}</p>}}", vec![attrs("a"), wrap("w")], false),
                   WrapperCrossesElement("p".into()));
    }
}
