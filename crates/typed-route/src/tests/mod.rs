//! Crate-level test modules
//!
//! Each module exercises one compiler or the routing layer through the
//! public API. Unit tests for private helpers live next to the code.

#[cfg(test)]
pub mod validation_tests;


#[cfg(test)]
pub mod typescript_tests;
