//! SQLite backend for the Uniagric marketplace.
//!
//! [`SqliteStore`] implements both the document store
//! ([`uniagric_core::store::MarketStore`]) and the identity service
//! ([`uniagric_core::identity::IdentityProvider`]) over one database file.
//! All access goes through [`tokio_rusqlite`] so queries run on a dedicated
//! thread without blocking the async runtime.

mod encode;
mod identity;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use identity::LogCodeSender;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
