//! Implementation of the `#[derive(Record)]` macro.
//!
//! Generates `sieve::Record` implementations and attribute key constants
//! from struct annotations.

mod attrs;
mod derive;

pub use derive::record_derive_impl;
