//! HTML templates with named markers, filled in by callbacks at
//! render time, and wrappers that put their own markup around
//! content rendered elsewhere.
//!
//! A template is compiled once together with the marker
//! declarations, in order of appearance:
//!
//! - `${name}`: a plain marker; between the attributes of a start
//!   tag it is an attribute marker that can add attributes or drop
//!   the element or its content.
//! - `${{name}` ... `}}`: a wrapper marker; its callback can register
//!   endings run at the `}}`, wrap the part in another wrapper, or
//!   drop it.
//! - `${}` (or `${{}}`): the content marker of a `Wrapper`.
//!
//! Rendering streams into a `Response`; nothing is built up as a
//! tree. Compiled components are immutable and can be shared between
//! threads.

pub mod arena;
pub mod component;
pub mod config;
pub mod error;
pub mod escape;
pub mod marker;
pub mod page;
pub mod pool;
pub mod response;

mod compiler;
mod render;
mod scanner;
mod token;

pub use component::{Component, Part, Template, Wrapper};
pub use config::PoolConfig;
pub use error::CompileError;
pub use escape::{escape_html, write_escaped};
pub use marker::{Callback, CallbackKind, Marker, MarkerKind, MarkerSpec};
pub use page::{Page, Text};
pub use pool::{Pools, POOLS};
pub use response::{AttrResponse, Response, WrapperResponse};
