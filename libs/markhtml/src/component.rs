//! Compiled, immutable templates and the components cut from them.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::compiler::{compile, Compiled};
use crate::error::CompileError;
use crate::marker::{Marker, MarkerSpec};
use crate::scanner::ElementSpan;

/// Everything compiled from one template source: the literal text,
/// the markers, and the elements carrying attribute markers. Marker
/// indices stored in markers and elements refer to `markers`.
pub struct Template<D> {
    pub(crate) html: Box<[u8]>,
    pub(crate) markers: Vec<Marker<D>>,
    pub(crate) elements: Vec<ElementSpan>,
}

impl<D> Template<D> {
    pub fn html(&self) -> &[u8] {
        &self.html
    }
    pub fn markers(&self) -> &[Marker<D>] {
        &self.markers
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Whole,
    PreContent,
    PostContent,
}

/// A marker index and literal offset to start rendering from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resume {
    pub marker: usize,
    pub pos: u32,
}

/// A range of a compiled template, rendered in one go.
pub struct Component<D> {
    pub(crate) template: Arc<Template<D>>,
    pub(crate) markers: Range<usize>,
    pub(crate) html: Range<u32>,
    pub(crate) max_wrapper_nesting: usize,
    pub(crate) part: Part,
}

impl<D> Component<D> {
    /// Compile a template without content marker. `markers` declares
    /// every `${name}` and `${{name}` in order of appearance.
    pub fn compile(html: &str, markers: Vec<MarkerSpec<D>>) -> Result<Self, CompileError> {
        let Compiled { template, max_wrapper_nesting, .. } = compile(html, markers, false)?;
        let html = 0..template.html.len() as u32;
        let markers = 0..template.markers.len();
        Ok(Component { template, markers, html, max_wrapper_nesting, part: Part::Whole })
    }

    pub fn compile_file(path: impl AsRef<Path>, markers: Vec<MarkerSpec<D>>) -> Result<Self> {
        let path = path.as_ref();
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("reading template {path:?}"))?;
        Self::compile(&html, markers)
            .with_context(|| format!("compiling template {path:?}"))
    }

    pub fn template(&self) -> &Template<D> {
        &self.template
    }

    pub fn part(&self) -> Part {
        self.part
    }

    /// This component's markers. Indices held by markers are
    /// template-wide, see `first_marker_index`.
    pub fn markers(&self) -> &[Marker<D>] {
        &self.template.markers[self.markers.clone()]
    }

    pub fn first_marker_index(&self) -> usize {
        self.markers.start
    }

    /// All literal bytes of this component.
    pub fn html(&self) -> &[u8] {
        &self.template.html[self.html.start as usize..self.html.end as usize]
    }

    /// The literal bytes after the last marker.
    pub fn html_tail(&self) -> &[u8] {
        let start = self.markers().last().map_or(self.html.start, |m| m.position());
        &self.template.html[start as usize..self.html.end as usize]
    }

    pub fn max_wrapper_nesting(&self) -> usize {
        self.max_wrapper_nesting
    }

    pub(crate) fn start(&self) -> Resume {
        Resume { marker: self.markers.start, pos: self.html.start }
    }
}

/// A template with a content marker, split there into the part
/// rendered before and the part rendered after the wrapped content.
pub struct Wrapper<D> {
    pub(crate) pre: Component<D>,
    pub(crate) post: Component<D>,
}

impl<D> Wrapper<D> {
    /// Compile a template with exactly one content marker (`${}` or
    /// `${{}}`).
    pub fn compile(html: &str, markers: Vec<MarkerSpec<D>>) -> Result<Self, CompileError> {
        let Compiled { template, content, max_wrapper_nesting } = compile(html, markers, true)?;
        let content = content.ok_or(CompileError::MissingContentMarker)?;
        let pre = Component {
            template: template.clone(),
            markers: 0..content.marker,
            html: 0..content.pos,
            max_wrapper_nesting,
            part: Part::PreContent,
        };
        let post = Component {
            markers: content.marker..template.markers.len(),
            html: content.pos..template.html.len() as u32,
            template,
            max_wrapper_nesting,
            part: Part::PostContent,
        };
        Ok(Wrapper { pre, post })
    }

    pub fn compile_file(path: impl AsRef<Path>, markers: Vec<MarkerSpec<D>>) -> Result<Self> {
        let path = path.as_ref();
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("reading wrapper template {path:?}"))?;
        Self::compile(&html, markers)
            .with_context(|| format!("compiling wrapper template {path:?}"))
    }

    pub fn pre_content(&self) -> &Component<D> {
        &self.pre
    }

    pub fn post_content(&self) -> &Component<D> {
        &self.post
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_split() {
        let w: Wrapper<()> = Wrapper::compile(
            "<w>${{box}BEFORE${}AFTER}}</w>",
            vec![MarkerSpec::wrapper("box", |_, _| ())]).unwrap();
        let (pre, post) = (w.pre_content(), w.post_content());
        assert_eq!(pre.html(), b"<w>BEFORE");
        assert_eq!(pre.html_tail(), b"BEFORE");
        assert_eq!(pre.markers().len(), 1);
        assert_eq!(post.html(), b"AFTER</w>");
        assert_eq!(post.html_tail(), b"</w>");
        assert_eq!(post.first_marker_index(), 1);
        assert_eq!(pre.max_wrapper_nesting(), 1);
        assert_eq!(post.max_wrapper_nesting(), 1);
        assert!(Arc::ptr_eq(&pre.template, &post.template));
        assert_eq!(post.part(), Part::PostContent);
    }

    #[test]
    fn t_no_markers() {
        let c: Component<()> = Component::compile("<p>static</p>", vec![]).unwrap();
        assert_eq!(c.html_tail(), b"<p>static</p>");
        assert_eq!(c.max_wrapper_nesting(), 0);
    }

    #[test]
    fn t_compile_file() {
        let path = std::env::temp_dir().join(format!("markhtml-t_compile_file-{}.html",
                                                     std::process::id()));
        std::fs::write(&path, "<b>${x}</b>").unwrap();
        let c: Component<()> = Component::compile_file(
            &path, vec![MarkerSpec::plain("x", |_, _| ())]).unwrap();
        assert_eq!(c.html(), b"<b></b>");
        let e = Component::<()>::compile_file(&path, vec![]).err().unwrap();
        assert!(format!("{e:#}").contains("unequal number"), "{e:#}");
        std::fs::remove_file(&path).unwrap();
        assert!(Component::<()>::compile_file(&path, vec![]).is_err());
    }
}
