//! Deterministic, pure logic shared by the interpreter.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod resolver;
pub mod result;
pub mod scope;
pub mod substitution;
pub mod summary;
pub mod variables;
