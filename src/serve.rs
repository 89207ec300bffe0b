//! Turning rendered `markhtml::Response`s into HTTP responses.

use std::borrow::Cow;

use chj_util::time_guard;
use markhtml::{escape_html, Response, POOLS};
use rouille::ResponseBody;

pub fn status_title(code: u16) -> &'static str {
    match code {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

pub fn errorpage_from_status(code: u16) -> rouille::Response {
    let title = escape_html(status_title(code));
    let resp = format!("<html><head><title>{title}</title></head><body><h1>{title}</h1>\
                        </body></html>\n");
    rouille::Response {
        status_code: code,
        headers: vec![(Cow::from("Content-Type"), Cow::from("text/html; charset=utf-8"))],
        data: ResponseBody::from_string(resp),
        upgrade: None,
    }
}

/// A halted response without redirect target only sends its status
/// (as error page if it's one); otherwise the output is the body.
pub fn htmlresponse(r: &Response) -> rouille::Response {
    if let Some(location) = r.location() {
        return rouille::Response {
            status_code: r.status(),
            headers: vec![(Cow::from("Location"), Cow::from(location.to_string()))],
            data: ResponseBody::empty(),
            upgrade: None,
        }
    }
    if r.is_halted() && r.status() >= 400 {
        return errorpage_from_status(r.status())
    }
    rouille::Response {
        status_code: r.status(),
        headers: vec![(Cow::from("Content-Type"), Cow::from("text/html; charset=utf-8"))],
        data: ResponseBody::from_data(r.as_bytes().to_vec()),
        upgrade: None,
    }
}

/// Render a page into a pooled response.
pub fn render_page(render: impl FnOnce(&mut Response)) -> rouille::Response {
    time_guard!("render_page");
    let mut r = POOLS.response();
    render(&mut *r);
    htmlresponse(&*r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn body(resp: rouille::Response) -> String {
        let (mut reader, _) = resp.data.into_reader_and_size();
        let mut s = String::new();
        reader.read_to_string(&mut s).unwrap();
        s
    }

    fn header<'r>(resp: &'r rouille::Response, name: &str) -> Option<&'r str> {
        resp.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| &**v)
    }

    #[test]
    fn t_render_page() {
        let resp = render_page(|r| r.write_str("<p>"));
        assert_eq!(resp.status_code, 200);
        assert_eq!(header(&resp, "content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(body(resp), "&lt;p&gt;");
    }

    #[test]
    fn t_redirect() {
        let resp = render_page(|r| {
            r.write_str("dropped");
            r.redirect_to_get("/there");
        });
        assert_eq!(resp.status_code, 303);
        assert_eq!(header(&resp, "Location"), Some("/there"));
        assert_eq!(body(resp), "");
    }

    #[test]
    fn t_halted_error() {
        chj_util::warn::set_enabled(false);
        let resp = render_page(|r| {
            r.write_str("partial");
            r.send_503("backend down");
        });
        assert_eq!(resp.status_code, 503);
        assert!(body(resp).contains("<h1>Service Unavailable</h1>"));
    }
}
