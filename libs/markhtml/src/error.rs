use kstring::KString;

use crate::marker::{CallbackKind, MarkerKind};

/// Everything that can be wrong with a template or its marker
/// declarations. Reported by the constructors, never at render time.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("unbalanced wrapper start and end points")]
    UnbalancedWrapper,
    #[error("only one wrapper content marker is allowed")]
    DuplicateContentMarker,
    #[error("content marker found in a template that is not a wrapper")]
    UnexpectedContentMarker,
    #[error("a wrapper must define a content marker")]
    MissingContentMarker,
    #[error("marker {found:?} found where the declaration {expected:?} was next")]
    NameOrderMismatch { expected: KString, found: KString },
    #[error("marker name {0:?} used more than once")]
    DuplicateName(KString),
    #[error("unequal number of template markers ({found}) and marker declarations ({declared})")]
    MarkerCountMismatch { declared: usize, found: usize },
    #[error("marker {name:?} is a {kind:?} marker but was given a {callback:?} callback")]
    CallbackKindMismatch { name: KString, kind: MarkerKind, callback: CallbackKind },
    #[error("wrapper or content token inside an HTML tag at byte {0}")]
    WrapperTokenInsideTag(usize),
    #[error("marker {0:?} inside an HTML end tag")]
    MarkerInsideEndTag(KString),
    #[error("element <{0}> carrying attribute markers is never closed")]
    UnclosedElement(KString),
    #[error("wrapper nesting crosses the boundary of element <{0}> carrying attribute markers")]
    WrapperCrossesElement(KString),
    #[error("template literal text exceeds 4 GiB")]
    TemplateTooLarge,
}
