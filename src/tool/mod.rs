//! Compiler installations: configuration, per-node resolution and lookup.

mod installation;
mod node;
mod store;

pub use installation::*;
pub use node::*;
pub use store::*;
