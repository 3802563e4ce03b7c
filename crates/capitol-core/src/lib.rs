//! Core types and trait definitions for Capitol, a pipeline that groups
//! congressional trade disclosures into sessions and scores them for conflicts
//! of interest.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backends (`capitol-store-sqlite`), the orchestration layer
//! (`capitol-pipeline`) and the binary (`capitol-cli`) all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod analysis;
pub mod context;
pub mod directory;
pub mod error;
pub mod grouping;
pub mod identity;
pub mod prompt;
pub mod reconcile;
pub mod relevance;
pub mod response;
pub mod scoring;
pub mod session;
pub mod store;
pub mod trade;

pub use error::{Error, Result};
