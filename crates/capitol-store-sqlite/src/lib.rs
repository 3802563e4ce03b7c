//! SQLite backend for Capitol.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One [`SqliteStore`] implements every
//! storage trait in [`capitol_core::store`].

mod analysis;
mod directory;
mod encode;
mod schema;
mod sessions;
mod staging;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
