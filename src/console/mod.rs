//! Console output classification and annotation.

mod annotator;
mod note;
mod patterns;
mod splitter;

pub use annotator::*;
pub use note::*;
pub use patterns::*;
pub use splitter::*;
