//! pbc-compile - Run the PowerBuilder pbc compiler as a build step.

pub mod build;
pub mod command;
pub mod config;
pub mod console;
pub mod display;
pub mod process;
pub mod tool;
