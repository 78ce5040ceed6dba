//! Testing utilities and mock implementations
//!
//! Lets the pipeline run end to end without model, search or disk access.

pub mod mocks;

pub use mocks::*;
