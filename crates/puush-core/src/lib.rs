//! Core types and trait definitions for the puush file host.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The store and server crates depend on it; it depends on nothing
//! proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod allocator;
pub mod blob;
pub mod error;
pub mod file;
pub mod registry;
pub mod session;

pub use error::{Error, Result};
