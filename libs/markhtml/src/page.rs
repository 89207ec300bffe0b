//! Building a whole HTML document as a component: every piece of
//! caller-provided text is a static part plus an optional callback,
//! compiled into generated markers (`m0`, `m1`, ...).

use kstring::KString;

use crate::component::Component;
use crate::error::CompileError;
use crate::escape::escape_html;
use crate::marker::{Callback, MarkerSpec, PlainFn};
use crate::response::Response;

/// Static HTML followed by the output of an optional callback.
pub struct Text<D> {
    pub static_html: KString,
    pub dynamic: Option<PlainFn<D>>,
}

impl<D> Text<D> {
    /// HTML that is inserted as is.
    pub fn html(s: impl Into<KString>) -> Self {
        Text { static_html: s.into(), dynamic: None }
    }

    /// Plain text, escaped now.
    pub fn text(s: &str) -> Self {
        Text::html(KString::from_ref(&escape_html(s)))
    }

    pub fn dynamic(f: impl Fn(&mut Response, &D) + Send + Sync + 'static) -> Self {
        Text { static_html: KString::from_static(""), dynamic: Some(Box::new(f)) }
    }

    /// Add a callback producing output after the static part.
    pub fn then(mut self, f: impl Fn(&mut Response, &D) + Send + Sync + 'static) -> Self {
        self.dynamic = Some(Box::new(f));
        self
    }
}

impl<D> From<&'static str> for Text<D> {
    fn from(s: &'static str) -> Self {
        Text::html(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Referrer {
    NoReferrer,
    NoReferrerWhenDowngrade,
    Origin,
    OriginWhenCrossOrigin,
    SameOrigin,
    StrictOrigin,
    StrictOriginWhenCrossOrigin,
    UnsafeUrl,
}

impl Referrer {
    pub fn as_str(self) -> &'static str {
        match self {
            Referrer::NoReferrer => "no-referrer",
            Referrer::NoReferrerWhenDowngrade => "no-referrer-when-downgrade",
            Referrer::Origin => "origin",
            Referrer::OriginWhenCrossOrigin => "origin-when-cross-origin",
            Referrer::SameOrigin => "same-origin",
            Referrer::StrictOrigin => "strict-origin",
            Referrer::StrictOriginWhenCrossOrigin => "strict-origin-when-cross-origin",
            Referrer::UnsafeUrl => "unsafe-url",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Meta {
    pub viewport: Option<KString>,
    pub application_name: Option<KString>,
    pub author: Option<KString>,
    pub description: Option<KString>,
    pub generator: Option<KString>,
    pub keywords: Vec<KString>,
    pub referrer: Option<Referrer>,
    pub theme_color: Option<KString>,
    pub color_scheme: Option<KString>,
}

#[derive(Debug, Clone)]
pub struct Link {
    pub rel: KString,
    pub href: KString,
}

impl Link {
    pub fn stylesheet(href: impl Into<KString>) -> Self {
        Link { rel: KString::from_static("stylesheet"), href: href.into() }
    }
}

#[derive(Debug, Clone)]
pub struct Script {
    pub src: KString,
    pub defer: bool,
    pub module: bool,
}

pub struct Head<D> {
    pub title: Option<Text<D>>,
    pub meta: Meta,
    pub links: Vec<Link>,
    pub style: Option<Text<D>>,
    pub scripts: Vec<Script>,
}

impl<D> Default for Head<D> {
    fn default() -> Self {
        Head { title: None, meta: Meta::default(), links: Vec::new(), style: None,
               scripts: Vec::new() }
    }
}

pub struct Page<D> {
    pub lang: KString,
    pub head: Head<D>,
    pub body_attributes: Vec<(KString, KString)>,
    pub noscript: Option<Text<D>>,
    pub body: Vec<Text<D>>,
}

impl<D> Default for Page<D> {
    fn default() -> Self {
        Page {
            lang: KString::from_static("en"),
            head: Head::default(),
            body_attributes: Vec::new(),
            noscript: None,
            body: Vec::new(),
        }
    }
}

/// Collects the template source and the generated marker
/// declarations.
struct Builder<D> {
    src: String,
    specs: Vec<MarkerSpec<D>>,
}

impl<D> Builder<D> {
    /// Literal template source; must not contain markers.
    fn tag(&mut self, s: &str) {
        self.src.push_str(s);
    }

    fn piece(&mut self, static_html: KString, dynamic: Option<PlainFn<D>>) {
        let name = format!("m{}", self.specs.len());
        self.src.push_str("${");
        self.src.push_str(&name);
        self.src.push('}');
        let mut spec = MarkerSpec::fixed(name).with_static(static_html);
        spec.callback = dynamic.map(Callback::Plain);
        self.specs.push(spec);
    }

    fn text(&mut self, t: Text<D>) {
        self.piece(t.static_html, t.dynamic)
    }

    fn escaped(&mut self, s: &str) {
        self.piece(KString::from_ref(&escape_html(s)), None)
    }

    fn meta(&mut self, name: &str, content: Option<&str>) {
        if let Some(content) = content {
            self.tag("<meta name=\"");
            self.tag(name);
            self.tag("\" content=\"");
            self.escaped(content);
            self.tag("\">");
        }
    }
}

impl<D> Page<D> {
    pub fn new() -> Self {
        Page::default()
    }

    /// Generate the document and compile it.
    pub fn build(self) -> Result<Component<D>, CompileError> {
        let mut b = Builder { src: String::new(), specs: Vec::new() };
        b.tag("<!DOCTYPE html>\n<html lang=\"");
        b.escaped(&self.lang);
        b.tag("\"><head><meta charset=\"utf-8\">");
        let Head { title, meta, links, style, scripts } = self.head;
        if let Some(title) = title {
            b.tag("<title>");
            b.text(title);
            b.tag("</title>");
        }
        b.meta("viewport", meta.viewport.as_deref());
        b.meta("application-name", meta.application_name.as_deref());
        b.meta("author", meta.author.as_deref());
        b.meta("description", meta.description.as_deref());
        b.meta("generator", meta.generator.as_deref());
        if !meta.keywords.is_empty() {
            let keywords: Vec<&str> = meta.keywords.iter().map(|k| k.as_str()).collect();
            b.meta("keywords", Some(keywords.join(",").as_str()));
        }
        b.meta("referrer", meta.referrer.map(Referrer::as_str));
        b.meta("theme-color", meta.theme_color.as_deref());
        b.meta("color-scheme", meta.color_scheme.as_deref());
        for link in &links {
            b.tag("<link rel=\"");
            b.escaped(&link.rel);
            b.tag("\" href=\"");
            b.escaped(&link.href);
            b.tag("\">");
        }
        if let Some(style) = style {
            b.tag("<style>");
            b.text(style);
            b.tag("</style>");
        }
        for script in &scripts {
            b.tag("<script src=\"");
            b.escaped(&script.src);
            b.tag("\"");
            if script.defer {
                b.tag(" defer");
            }
            if script.module {
                b.tag(" type=\"module\"");
            }
            b.tag("></script>");
        }
        b.tag("</head><body");
        for (key, value) in &self.body_attributes {
            b.tag(" ");
            b.escaped(key);
            b.tag("=\"");
            b.escaped(value);
            b.tag("\"");
        }
        b.tag(">");
        if let Some(noscript) = self.noscript {
            b.tag("<noscript>");
            b.text(noscript);
            b.tag("</noscript>");
        }
        for t in self.body {
            b.text(t);
        }
        b.tag("</body></html>\n");
        Component::compile(&b.src, b.specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_page() {
        let mut page: Page<&str> = Page::new();
        page.head.title = Some(Text::text("Tom & Jerry").then(|r, name: &&str| {
            r.write_str(" - ");
            r.write_str(name);
        }));
        page.head.meta.description = Some("say \"${hi}\"".into());
        page.head.meta.keywords = vec!["a".into(), "b".into()];
        page.head.meta.referrer = Some(Referrer::SameOrigin);
        page.head.links.push(Link::stylesheet("/main.css"));
        page.head.scripts.push(Script { src: "/app.js".into(), defer: true, module: false });
        page.body_attributes.push(("class".into(), "dark".into()));
        page.body.push("<h1>${not a marker}</h1>".into());
        page.body.push(Text::dynamic(|r, name: &&str| r.write_str(name)));
        let c = page.build().unwrap();
        assert_eq!(c.markers().len(), 2);

        let mut r = Response::new();
        c.render(&mut r, &"<you>");
        assert_eq!(
            std::str::from_utf8(r.as_bytes()).unwrap(),
            "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
             <title>Tom &amp; Jerry - &lt;you&gt;</title>\
             <meta name=\"description\" content=\"say &#34;${hi}&#34;\">\
             <meta name=\"keywords\" content=\"a,b\">\
             <meta name=\"referrer\" content=\"same-origin\">\
             <link rel=\"stylesheet\" href=\"/main.css\">\
             <script src=\"/app.js\" defer></script>\
             </head><body class=\"dark\"><h1>${not a marker}</h1>&lt;you&gt;</body></html>\n");
    }
}
