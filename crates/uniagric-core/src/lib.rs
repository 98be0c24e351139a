//! Core types and trait definitions for the Uniagric marketplace.
//!
//! This crate is free of HTTP, database and process-spawning dependencies.
//! Storage backends implement [`store::MarketStore`] and
//! [`identity::IdentityProvider`]; script adapters implement
//! [`tools::FarmTools`]; registration scoring implements
//! [`risk::RiskAssessor`]. The auth access layer ([`accounts::Accounts`]) and
//! the client session ([`session::Session`]) are written against those traits.

#![allow(async_fn_in_trait)]

pub mod accounts;
pub mod error;
pub mod farm;
pub mod identity;
pub mod investment;
pub mod portfolio;
pub mod registration;
pub mod risk;
pub mod session;
pub mod store;
pub mod tools;
pub mod user;

pub use error::{Error, Result};
