//! Command line construction: tokenizing, macro expansion, code pages and
//! platform wrapping.

mod builder;
mod codepage;
mod macros;
mod tokenize;

pub use builder::*;
pub use codepage::*;
pub use macros::*;
pub use tokenize::*;
