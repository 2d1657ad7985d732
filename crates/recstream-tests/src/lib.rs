//! Shared fixtures for the recstream integration tests and benchmarks.
//!
//! Every test works from the same small set of record definitions so that
//! encoder and decoder agree on layouts without each test restating them.

#![warn(clippy::pedantic)]

pub mod fixtures;
pub mod transport;
