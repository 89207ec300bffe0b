//! # Tools for performance debugging.

//! `time_guard!` reports the time until the end of the enclosing
//! scope, but only if the `TIME_GUARD` env var is set to a truthy
//! value or `enabled_set(true)` was called in the thread. Prefixing
//! the name with `no` compiles it out completely.

use std::{cell::Cell, fmt::Debug, time::Instant};

fn time_guard_env_get() -> bool {
    match std::env::var("TIME_GUARD") {
        Ok(v) => !matches!(v.as_str(), "0" | "" | "off" | "false" | "no"),
        Err(_) => false,
    }
}

thread_local!{
    pub static ENABLED: Cell<bool> = Cell::new(time_guard_env_get());
}

/// Enable `time_guard!` for the current thread.
pub fn enabled_set(on: bool) {
    ENABLED.with(|cell| cell.set(on))
}

pub fn enabled() -> bool {
    ENABLED.with(|cell| cell.get())
}

pub enum TimeGuard<S: Debug> {
    Disabled,
    Enabled {
        name: S,
        start: Instant,
    },
}

impl<S: Debug> TimeGuard<S> {
    pub fn new(name: S) -> Self {
        if enabled() {
            TimeGuard::Enabled { name, start: Instant::now() }
        } else {
            TimeGuard::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, TimeGuard::Enabled { .. })
    }
}

impl<S: Debug> Drop for TimeGuard<S> {
    fn drop(&mut self) {
        if let TimeGuard::Enabled { name, start } = self {
            let elapsed = start.elapsed();
            crate::warn::write_line(
                "T", true, format_args!("{name:?}: {elapsed:?}"), file!(), line!());
        }
    }
}

#[macro_export]
macro_rules! time_guard {
    ($namestr:expr) => {
        let _guard = $crate::time_guard::TimeGuard::new($namestr);
    }
}

#[macro_export]
macro_rules! notime_guard {
    ($namestr:expr) => {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_enabled_per_thread() {
        enabled_set(true);
        assert!(TimeGuard::new("a").is_enabled());
        std::thread::spawn(|| {
            enabled_set(false);
            assert!(!TimeGuard::new("b").is_enabled());
        }).join().unwrap();
        assert!(enabled());
        enabled_set(false);
        assert!(!TimeGuard::new("c").is_enabled());
    }
}
