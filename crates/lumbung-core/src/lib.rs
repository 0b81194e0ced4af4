//! Core types and trait definitions for the Lumbung assistance store.
//!
//! Lumbung tracks village social-assistance programs: which catalog items a
//! program hands out, which families or residents are enrolled, whether each
//! beneficiary showed up, and when the program as a whole is finished. This
//! crate is deliberately free of HTTP and database dependencies. All other
//! crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod item;
pub mod program;
pub mod recipient;
pub mod registry;
pub mod store;

pub use error::{Error, Result};
