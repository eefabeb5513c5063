//! Side-effecting edges: suite files, config, console and report output.

pub mod config;
pub mod console;
pub mod loader;
pub mod report;
