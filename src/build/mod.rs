//! The compile build step and its outcome.

mod error;
mod listener;
mod outcome;
mod step;

pub use error::*;
pub use listener::*;
pub use outcome::*;
pub use step::*;
