pub mod warn;
pub mod time_guard;
