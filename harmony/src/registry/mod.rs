//! Registries populated before a run and read-only during it.

pub mod callbacks;
pub mod directives;
pub mod tasks;
