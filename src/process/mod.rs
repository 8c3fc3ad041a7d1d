//! Compiler process requests and launching.

mod launcher;
mod request;

pub use launcher::*;
pub use request::*;
