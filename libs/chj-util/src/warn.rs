//! Printing warnings to stderr.

//! All macros print a single line (prefix, message, source location)
//! through a locked, buffered stderr so that lines from different
//! threads don't interleave. `warn!` can be switched off globally via
//! `set_enabled(false)` (the tests do that to keep output clean);
//! `warn_thread!` is off by default and additionally prints the
//! thread id, for request tracing in servers.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

pub static WARN_ENABLED: AtomicBool = AtomicBool::new(true);
pub static WARN_THREAD_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn set_enabled(on: bool) {
    WARN_ENABLED.store(on, Ordering::SeqCst)
}

pub fn enabled() -> bool {
    WARN_ENABLED.load(Ordering::SeqCst)
}

pub fn set_thread_enabled(on: bool) {
    WARN_THREAD_ENABLED.store(on, Ordering::SeqCst)
}

pub fn thread_enabled() -> bool {
    WARN_THREAD_ENABLED.load(Ordering::SeqCst)
}

/// Used by the macros, not meant to be called directly.
pub fn write_line(
    prefix: &str,
    with_thread: bool,
    msg: std::fmt::Arguments,
    file: &str,
    line: u32,
) {
    let mut outp = std::io::BufWriter::new(std::io::stderr().lock());
    if with_thread {
        let _ = write!(&mut outp, "{:?} ", std::thread::current().id());
    }
    let _ = write!(&mut outp, "{prefix}: ");
    let _ = outp.write_fmt(msg);
    let _ = writeln!(&mut outp, " at {file:?} line {line}");
    let _ = outp.flush();
}

#[macro_export]
macro_rules! warn {
    ($formatstr:expr $(,$arg:expr)* $(,)?) => { {
        if $crate::warn::enabled() {
            $crate::warn::write_line(
                "W", false, format_args!($formatstr $(,$arg)*), file!(), line!());
        }
    } }
}

#[macro_export]
macro_rules! nowarn {
    ($formatstr:expr $(,$arg:expr)* $(,)?) => {
    }
}

#[macro_export]
macro_rules! warn_thread {
    ($formatstr:expr $(,$arg:expr)* $(,)?) => { {
        if $crate::warn::thread_enabled() {
            $crate::warn::write_line(
                "W", true, format_args!($formatstr $(,$arg)*), file!(), line!());
        }
    } }
}

#[macro_export]
macro_rules! nowarn_thread {
    ($formatstr:expr $(,$arg:expr)* $(,)?) => {
    }
}
