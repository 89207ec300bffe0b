//! The request-scoped output: everything callbacks can do to the
//! response being rendered.

use std::fmt::{self, Display};
use std::mem;
use std::ops::{Deref, DerefMut};

use chj_util::warn;
use kstring::KString;

use crate::component::{Component, Wrapper};
use crate::config::PoolConfig;
use crate::escape::{write_escaped, write_undoublequoted};
use crate::pool::{Frame, Recycle};

pub struct Response {
    out: Vec<u8>,
    status: u16,
    location: Option<KString>,
    halted: bool,
    pub(crate) skip_content: bool,
    pub(crate) skip_element: bool,
    /// Endings of the wrapper start whose callback is running.
    pub(crate) frame: Frame,
}

impl Default for Response {
    fn default() -> Self {
        Response::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Response::with_capacity(0)
    }

    pub fn with_capacity(n: usize) -> Self {
        Response {
            out: Vec::with_capacity(n),
            status: 200,
            location: None,
            halted: false,
            skip_content: false,
            skip_element: false,
            frame: Frame::new(),
        }
    }

    /// Write text, HTML-escaped.
    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes())
    }

    /// Write bytes, HTML-escaped.
    pub fn write_bytes(&mut self, b: &[u8]) {
        if !self.halted {
            write_escaped(&mut self.out, b);
        }
    }

    /// Write HTML as is.
    /// Write `v` formatted via `Display`, escaped.
    pub fn write_display(&mut self, v: impl Display) {
        fmt::Write::write_fmt(self, format_args!("{v}"))
            .expect("a Display implementation returned an error unexpectedly")
    }

    pub fn write_str_no_escape(&mut self, s: &str) {
        self.write_bytes_no_escape(s.as_bytes())
    }

    pub fn write_bytes_no_escape(&mut self, b: &[u8]) {
        if !self.halted {
            self.out.extend_from_slice(b);
        }
    }

    pub(crate) fn out_len(&self) -> usize {
        self.out.len()
    }

    pub(crate) fn truncate_output(&mut self, len: usize) {
        self.out.truncate(len)
    }

    /// Render `component` here, e.g. from within a callback.
    pub fn insert<D>(&mut self, component: &Component<D>, data: &D) {
        component.render(self, data)
    }

    /// Render `wrapper` here around the output of `inner`.
    pub fn insert_wrapped<D>(
        &mut self, wrapper: &Wrapper<D>, data: &D, inner: impl FnOnce(&mut Response),
    ) {
        wrapper.render(self, data, inner)
    }

    /// Stop rendering: no further output is produced, no further
    /// callbacks or endings are run.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// The target of a redirect, if one was requested.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Answer with a redirect instead of the rendered page; halts.
    pub fn redirect(&mut self, status: u16, location: &str) {
        self.status = status;
        self.location = Some(KString::from_ref(location));
        self.halt();
    }

    pub fn permanent_redirect(&mut self, location: &str) {
        self.redirect(301, location)
    }

    pub fn redirect_to_get(&mut self, location: &str) {
        self.redirect(303, location)
    }

    pub fn temporary_redirect(&mut self, location: &str) {
        self.redirect(307, location)
    }

    /// Give up on the page with a 503; halts.
    pub fn send_503(&mut self, err: impl Display) {
        warn!("sending 503: {err}");
        self.status = 503;
        self.halt();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    pub fn capacity(&self) -> usize {
        self.out.capacity()
    }

    pub(crate) fn take_skip_content(&mut self) -> bool {
        mem::take(&mut self.skip_content)
    }

    pub(crate) fn take_skip_element(&mut self) -> bool {
        mem::take(&mut self.skip_element)
    }

    pub(crate) fn take_skip_flags(&mut self) -> (bool, bool) {
        (self.take_skip_content(), self.take_skip_element())
    }

    pub(crate) fn restore_skip_flags(&mut self, (content, element): (bool, bool)) {
        self.skip_content = content;
        self.skip_element = element;
    }
}

impl fmt::Write for Response {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

impl Recycle for Response {
    fn recycle(&mut self, config: &PoolConfig) -> bool {
        self.out.clear();
        self.out.shrink_to(config.max_output_capacity);
        self.status = 200;
        self.location = None;
        self.halted = false;
        self.skip_content = false;
        self.skip_element = false;
        self.frame.clear();
        true
    }
}

/// What a wrapper-start callback gets.
pub struct WrapperResponse<'r> {
    pub(crate) r: &'r mut Response,
}

impl<'r> WrapperResponse<'r> {
    pub(crate) fn new(r: &'r mut Response) -> Self {
        WrapperResponse { r }
    }

    /// Run `f` when this wrapper's `}}` is reached. Endings run in
    /// reverse order of registration.
    pub fn add_ending(&mut self, f: impl FnOnce(&mut Response) + Send + 'static) {
        self.r.frame.push(Box::new(f));
    }

    /// Drop everything between this marker and its `}}`.
    pub fn skip_content(&mut self) {
        self.r.skip_content = true;
    }
}

impl<'r> Deref for WrapperResponse<'r> {
    type Target = Response;
    fn deref(&self) -> &Response {
        &*self.r
    }
}

impl<'r> DerefMut for WrapperResponse<'r> {
    fn deref_mut(&mut self) -> &mut Response {
        &mut *self.r
    }
}

/// What an attribute callback gets.
pub struct AttrResponse<'r> {
    r: &'r mut Response,
}

impl<'r> AttrResponse<'r> {
    pub(crate) fn new(r: &'r mut Response) -> Self {
        AttrResponse { r }
    }

    fn write_key(&mut self, key: &str, escape: bool) {
        self.r.out.push(b' ');
        if key.is_empty() {
            self.r.out.push(b'_');
        } else if escape {
            write_escaped(&mut self.r.out, key.as_bytes());
        } else {
            self.r.out.extend_from_slice(key.as_bytes());
        }
    }

    /// Write ` key="value"`, both escaped.
    pub fn add_attr(&mut self, key: &str, value: &str) {
        if self.r.halted {
            return
        }
        self.write_key(key, true);
        self.r.out.extend_from_slice(b"=\"");
        write_escaped(&mut self.r.out, value.as_bytes());
        self.r.out.push(b'"');
    }

    /// Write ` key="value"` escaping only double quotes in the value.
    pub fn add_attr_no_escape(&mut self, key: &str, value: &str) {
        if self.r.halted {
            return
        }
        self.write_key(key, false);
        self.r.out.extend_from_slice(b"=\"");
        write_undoublequoted(&mut self.r.out, value.as_bytes());
        self.r.out.push(b'"');
    }

    /// Write ` key` without value.
    pub fn add_flag(&mut self, key: &str) {
        if self.r.halted {
            return
        }
        self.write_key(key, true);
    }

    /// Drop the whole element, start tag to end tag.
    pub fn skip_element(&mut self) {
        self.r.skip_element = true;
    }

    /// Keep the tags but drop everything between them.
    pub fn skip_content(&mut self) {
        self.r.skip_content = true;
    }
}

impl<'r> Deref for AttrResponse<'r> {
    type Target = Response;
    fn deref(&self) -> &Response {
        &*self.r
    }
}

impl<'r> DerefMut for AttrResponse<'r> {
    fn deref_mut(&mut self) -> &mut Response {
        &mut *self.r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn t_writes() {
        let mut r = Response::new();
        r.write_str("<b>");
        r.write_str_no_escape("<b>");
        r.write_bytes(b"'\0'");
        write!(r, " {}&{}", 1, "<2>").unwrap();
        r.write_display(format_args!("|{}", '"'));
        assert_eq!(r.as_bytes(),
                   "&lt;b&gt;<b>&#39;\u{FFFD}&#39; 1&amp;&lt;2&gt;|&#34;".as_bytes());
    }

    #[test]
    fn t_halt_and_redirect() {
        let mut r = Response::new();
        r.write_str("a");
        r.temporary_redirect("/login?next=/x");
        r.write_str("b");
        r.write_str_no_escape("c");
        assert!(r.is_halted());
        assert_eq!(r.status(), 307);
        assert_eq!(r.location(), Some("/login?next=/x"));
        assert_eq!(r.into_bytes(), b"a");

        let mut r = Response::new();
        chj_util::warn::set_enabled(false);
        r.send_503("database gone");
        assert_eq!(r.status(), 503);
        assert!(r.is_halted());
    }

    #[test]
    fn t_attributes() {
        let mut r = Response::new();
        {
            let mut a = AttrResponse::new(&mut r);
            a.add_attr("title", "Tom & \"Jerry\"");
            a.add_attr_no_escape("data-x", "<\"raw\">");
            a.add_attr("", "v");
            a.add_flag("hidden");
        }
        assert_eq!(std::str::from_utf8(r.as_bytes()).unwrap(),
                   " title=\"Tom &amp; &#34;Jerry&#34;\" data-x=\"<&#34;raw&#34;>\" _=\"v\" hidden");
    }
}
