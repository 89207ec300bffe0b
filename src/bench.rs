//! A page with a big table, for measuring rendering throughput
//! (e.g. with `ab` or `wrk` against `/bench`).

use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use markhtml::{CompileError, Component, MarkerSpec, Response};

struct State {
    counter: i64,
}

lazy_static! {
    static ref STATE: Mutex<State> = Mutex::new(State { counter: 0 });
}

#[derive(Debug, Clone, Copy)]
pub struct Row {
    pub counter: i64,
    pub i: i64,
}

pub struct Bench {
    page: Component<i64>,
}

impl Bench {
    pub fn new() -> Result<Self, CompileError> {
        let row = Arc::new(Component::compile(
            "<tr><td>${td0}</td><td>${td1}</td></tr>",
            vec![
                MarkerSpec::plain("td0", |r, row: &Row| {
                    r.write_display(row.counter);
                    r.write_str("abc");
                }),
                MarkerSpec::plain("td1", |r, row: &Row| {
                    let onoff = if (row.i as f64 * 0.1).sin() > 0.432 { "on" } else { "off" };
                    r.write_display(format_args!("{} - {}", row.i + row.counter, onoff));
                }),
            ])?);
        let page = Component::compile(
            "<html><head><title>Test page</title></head><body>\
             <p>Hello world!</p><p>Counter: ${counter}</p><table>${rows}</table>\
             </body></html>",
            vec![
                MarkerSpec::plain("counter", |r, counter: &i64| r.write_display(counter)),
                MarkerSpec::plain("rows", move |r, counter: &i64| {
                    for i in 100..25000 {
                        r.insert(&row, &Row { counter: *counter, i });
                    }
                }),
            ])?;
        Ok(Bench { page })
    }

    /// Bumps the counter and renders the table for it.
    pub fn render(&self, r: &mut Response) {
        let counter = {
            let mut m = STATE.lock().expect("die too if poisoned");
            m.counter += 1;
            m.counter
        };
        self.render_for(r, counter)
    }

    pub fn render_for(&self, r: &mut Response, counter: i64) {
        r.insert(&self.page, &counter)
    }
}
