//! The demo site: a layout wrapper around a few pages.

use std::sync::atomic::{AtomicU64, Ordering};

use markhtml::{CompileError, Component, MarkerSpec, Response, Wrapper};
use rouille::{router, Request};

use crate::bench::Bench;
use crate::serve::{errorpage_from_status, render_page};

/// Per-request data for the layout and the pages.
#[derive(Debug, Clone)]
pub struct PageData {
    pub title: &'static str,
    pub path: &'static str,
    pub user: Option<String>,
}

static RENDERS: AtomicU64 = AtomicU64::new(0);

const LAYOUT: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>${title}</title></head>
<body ${body}><nav><a ${home} href="/">Home</a> <a href="/bench">Benchmark</a>${{admin} <a href="/admin">Admin (${user})</a>}}</nav>
<main>${}</main>
<footer>${renders} pages rendered</footer></body></html>
"#;

fn layout() -> Result<Wrapper<PageData>, CompileError> {
    Wrapper::compile(LAYOUT, vec![
        MarkerSpec::plain("title", |r, d: &PageData| r.write_str(d.title)),
        MarkerSpec::attributes("body", |r, d: &PageData| if d.user.is_some() {
            r.add_attr("class", "logged-in")
        }),
        MarkerSpec::attributes("home", |r, d: &PageData| if d.path == "/" {
            r.add_attr("aria-current", "page")
        }),
        MarkerSpec::wrapper("admin", |r, d: &PageData| if d.user.is_none() {
            r.skip_content()
        }),
        MarkerSpec::plain("user", |r, d: &PageData| if let Some(user) = &d.user {
            r.write_str(user)
        }),
        MarkerSpec::plain("renders", |r, _: &PageData| {
            let n = RENDERS.fetch_add(1, Ordering::Relaxed) + 1;
            r.write_display(n);
        }),
    ])
}

fn home() -> Result<Component<PageData>, CompileError> {
    Component::compile(
        "<h1>Welcome${name}</h1>\
         <p>This page is put together from marker templates.</p>",
        vec![
            MarkerSpec::plain("name", |r, d: &PageData| if let Some(user) = &d.user {
                r.write_str(", ");
                r.write_str(user);
            }),
        ])
}

fn admin() -> Result<Component<PageData>, CompileError> {
    Component::compile(
        "<h1>Admin</h1><p>Logged in as ${user}.</p>",
        vec![
            // The layout is already written here; htmlresponse sends
            // no body with a redirect.
            MarkerSpec::plain("user", |r, d: &PageData| match &d.user {
                Some(user) => r.write_str(user),
                None => r.temporary_redirect("/"),
            }),
        ])
}

pub struct Site {
    layout: Wrapper<PageData>,
    home: Component<PageData>,
    admin: Component<PageData>,
    bench: Bench,
}

impl Site {
    pub fn new() -> Result<Self, CompileError> {
        Ok(Site { layout: layout()?, home: home()?, admin: admin()?, bench: Bench::new()? })
    }

    pub fn render_home(&self, r: &mut Response, data: &PageData) {
        self.layout.render(r, data, |r| r.insert(&self.home, data))
    }

    pub fn render_admin(&self, r: &mut Response, data: &PageData) {
        self.layout.render(r, data, |r| r.insert(&self.admin, data))
    }

    pub fn handle(&self, request: &Request) -> rouille::Response {
        // Demo only: whoever claims to be a user is one
        let user = request.get_param("user").filter(|u| !u.is_empty());
        let data = |title, path| PageData { title, path, user: user.clone() };
        router!(
            request,
            (GET) (/) => {
                render_page(|r| self.render_home(r, &data("Home", "/")))
            },
            (GET) (/admin) => {
                render_page(|r| self.render_admin(r, &data("Admin", "/admin")))
            },
            (GET) (/bench) => {
                render_page(|r| self.bench.render(r))
            },
            (GET) (/legacy) => {
                render_page(|r| r.permanent_redirect("/bench"))
            },
            _ => {
                errorpage_from_status(404)
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(site: &Site, f: fn(&Site, &mut Response, &PageData), user: Option<&str>)
            -> Response {
        let mut r = Response::new();
        let data = PageData { title: "T", path: "/", user: user.map(String::from) };
        f(site, &mut r, &data);
        r
    }

    fn text(r: &Response) -> &str {
        std::str::from_utf8(r.as_bytes()).unwrap()
    }

    #[test]
    fn t_home() {
        let site = Site::new().unwrap();
        let r = page(&site, Site::render_home, None);
        let html = text(&r);
        assert!(html.contains("<body ><nav><a  aria-current=\"page\" href=\"/\">Home</a> \
                               <a href=\"/bench\">Benchmark</a></nav>"), "{html}");
        assert!(html.contains("<main><h1>Welcome</h1><p>"), "{html}");
        assert!(html.contains(" pages rendered</footer></body></html>\n"));

        let r = page(&site, Site::render_home, Some("<ann>"));
        let html = text(&r);
        assert!(html.contains("<body  class=\"logged-in\">"), "{html}");
        assert!(html.contains(" <a href=\"/admin\">Admin (&lt;ann&gt;)</a></nav>"), "{html}");
        assert!(html.contains("<h1>Welcome, &lt;ann&gt;</h1>"), "{html}");
    }

    #[test]
    fn t_admin_redirects() {
        let site = Site::new().unwrap();
        let r = page(&site, Site::render_admin, None);
        assert!(r.is_halted());
        assert_eq!(r.status(), 307);
        assert_eq!(r.location(), Some("/"));
        assert!(text(&r).ends_with("<p>Logged in as "));

        let r = page(&site, Site::render_admin, Some("ann"));
        assert!(!r.is_halted());
        assert!(text(&r).contains("<main><h1>Admin</h1><p>Logged in as ann.</p></main>"));
    }
}
