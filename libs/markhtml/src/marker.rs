//! Marker declarations (what the template author hands in) and
//! compiled markers (what the renderer walks).

use std::fmt::Debug;

use kstring::KString;

use crate::arena::Span;
use crate::response::{AttrResponse, Response, WrapperResponse};

pub type PlainFn<D> = Box<dyn Fn(&mut Response, &D) + Send + Sync>;
pub type WrapperFn<D> = Box<dyn Fn(&mut WrapperResponse, &D) + Send + Sync>;
pub type AttrFn<D> = Box<dyn Fn(&mut AttrResponse, &D) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// `${name}` in text or in a quoted attribute value
    Plain,
    /// `${name}` between the attributes of a start tag
    Attributes,
    /// `${{name}`
    WrapperStart,
    /// `}}`
    WrapperEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Plain,
    Wrapper,
    Attributes,
}

pub enum Callback<D> {
    Plain(PlainFn<D>),
    Wrapper(WrapperFn<D>),
    Attributes(AttrFn<D>),
}

impl<D> Callback<D> {
    pub fn kind(&self) -> CallbackKind {
        match self {
            Callback::Plain(_) => CallbackKind::Plain,
            Callback::Wrapper(_) => CallbackKind::Wrapper,
            Callback::Attributes(_) => CallbackKind::Attributes,
        }
    }
}

/// The declaration for one named marker in a template, given in
/// the order the markers appear. Without a callback the marker is
/// replaced by its static text at compile time.
pub struct MarkerSpec<D> {
    pub name: KString,
    pub static_text: KString,
    pub callback: Option<Callback<D>>,
}

impl<D> MarkerSpec<D> {
    pub fn plain(
        name: impl Into<KString>,
        f: impl Fn(&mut Response, &D) + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, Some(Callback::Plain(Box::new(f))))
    }

    pub fn wrapper(
        name: impl Into<KString>,
        f: impl Fn(&mut WrapperResponse, &D) + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, Some(Callback::Wrapper(Box::new(f))))
    }

    pub fn attributes(
        name: impl Into<KString>,
        f: impl Fn(&mut AttrResponse, &D) + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, Some(Callback::Attributes(Box::new(f))))
    }

    /// A marker without callback; only its static text (if any)
    /// ends up in the output.
    pub fn fixed(name: impl Into<KString>) -> Self {
        Self::new(name, None)
    }

    fn new(name: impl Into<KString>, callback: Option<Callback<D>>) -> Self {
        MarkerSpec { name: name.into(), static_text: KString::from_static(""), callback }
    }

    /// HTML placed right before the marker's position. Not escaped.
    pub fn with_static(mut self, text: impl Into<KString>) -> Self {
        self.static_text = text.into();
        self
    }
}

impl<D> Debug for MarkerSpec<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerSpec")
            .field("name", &self.name)
            .field("static_text", &self.static_text)
            .field("callback", &self.callback.as_ref().map(|c| c.kind()))
            .finish()
    }
}

pub(crate) enum Action<D> {
    Plain(PlainFn<D>),
    /// Index into the template's element table.
    Attributes(AttrFn<D>, usize),
    /// Index of the paired `WrapperEnd` marker.
    WrapperStart(WrapperFn<D>, usize),
    /// Index of the paired `WrapperStart` marker.
    WrapperEnd(usize),
}

/// A compiled marker. Its position in the literal buffer is the end
/// of its prefix.
pub struct Marker<D> {
    pub(crate) name: KString,
    pub(crate) prefix: Span,
    pub(crate) action: Action<D>,
}

impl<D> Marker<D> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MarkerKind {
        match self.action {
            Action::Plain(_) => MarkerKind::Plain,
            Action::Attributes(..) => MarkerKind::Attributes,
            Action::WrapperStart(..) => MarkerKind::WrapperStart,
            Action::WrapperEnd(_) => MarkerKind::WrapperEnd,
        }
    }

    /// The literal bytes right before this marker, as a span.
    pub fn prefix(&self) -> Span {
        self.prefix
    }

    pub fn position(&self) -> u32 {
        self.prefix.end()
    }

    pub fn wrapper_end_index(&self) -> Option<usize> {
        match self.action {
            Action::WrapperStart(_, end) => Some(end),
            _ => None,
        }
    }
}

impl<D> Debug for Marker<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marker")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("prefix", &self.prefix)
            .finish()
    }
}
