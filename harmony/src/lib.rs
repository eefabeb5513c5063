//! YAML-driven interpreter for browser acceptance tests.
//!
//! Test plans name tasks, tasks hold steps, and steps hold free-text
//! directives such as `click #submit`, which are matched against a registry
//! of regular expressions bound to handlers driving a browser.
//!
//! - **[`core`]**: Pure logic (variable scopes, substitution, dependency
//!   order, result trees and their summary). No I/O.
//! - **[`io`]**: Suite loading, configuration and output.
//!
//! [`execute`] and [`runner`] walk plans through the registries held by a
//! [`runner::Context`]; [`library`] supplies the built-in directives and
//! [`driver`] the browser abstraction they act on.

pub mod core;
pub mod driver;
pub mod error;
pub mod execute;
pub mod exit_codes;
pub mod io;
pub mod library;
pub mod logging;
pub mod model;
pub mod registry;
pub mod runner;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
