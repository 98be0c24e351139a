//! The `MarketStore` trait: the document-store access layer.
//!
//! Implemented by storage backends (e.g. `uniagric-store-sqlite`). The HTTP
//! layer and [`crate::accounts::Accounts`] depend on this abstraction, not on
//! a concrete backend.

use std::future::Future;

use tokio::sync::watch;
use uuid::Uuid;

use crate::{
  farm::{FarmDetails, FarmListing},
  investment::{Investment, InvestmentReceipt, ProfitDistribution},
  portfolio::Portfolio,
  registration::{FarmerDocument, FarmerRecord, FarmerRegistration},
  risk::RiskAssessment,
  user::{User, UserType},
};

/// Exposes the domain rejection wrapped by a backend error, if any.
///
/// Lets callers tell "listing already invested" apart from "database down"
/// without knowing the backend's error type.
pub trait DomainError {
  fn domain(&self) -> Option<&crate::Error>;
}

/// Abstraction over the marketplace document store.
///
/// All methods return `Send` futures so the trait can be used behind `axum`
/// on a multi-threaded runtime.
pub trait MarketStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create or replace the user document keyed by `user.uid`.
  fn put_user(
    &self,
    user: User,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `None` if no document exists for `uid`.
  fn get_user(
    &self,
    uid: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Overwrite the stored role. Returns `false` if the user does not exist.
  fn set_user_type(
    &self,
    uid: Uuid,
    user_type: UserType,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Farm listings ─────────────────────────────────────────────────────

  /// Subscribe to the live list of available listings, newest first.
  ///
  /// The receiver observes a fresh snapshot after every change to the
  /// listings collection.
  fn watch_available_farms(
    &self,
  ) -> impl Future<Output = Result<watch::Receiver<Vec<FarmListing>>, Self::Error>>
  + Send
  + '_;

  /// Persist a new listing with status `available` and a server timestamp.
  fn create_farm(
    &self,
    farmer_id: Uuid,
    details: FarmDetails,
  ) -> impl Future<Output = Result<FarmListing, Self::Error>> + Send + '_;

  fn get_farm(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<FarmListing>, Self::Error>> + Send + '_;

  /// All listings owned by `farmer_id`, newest first, in any status.
  fn list_farms_by_farmer(
    &self,
    farmer_id: Uuid,
  ) -> impl Future<Output = Result<Vec<FarmListing>, Self::Error>> + Send + '_;

  // ── Investments ───────────────────────────────────────────────────────

  /// Mark the listing invested and record the paired investment and
  /// profit-distribution stub as one atomic write.
  ///
  /// Fails without writing anything if the listing is missing, no longer
  /// available, or `amount` is not a positive finite number.
  fn invest(
    &self,
    farm_id: Uuid,
    investor_id: Uuid,
    amount: f64,
  ) -> impl Future<Output = Result<InvestmentReceipt, Self::Error>> + Send + '_;

  /// One-shot fetch of an investor's investments, newest first.
  fn investments_for(
    &self,
    investor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Investment>, Self::Error>> + Send + '_;

  fn distributions_for(
    &self,
    investor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ProfitDistribution>, Self::Error>> + Send + '_;

  // ── Portfolios ────────────────────────────────────────────────────────

  /// Returns `None` rather than an error when the portfolio is absent.
  fn get_portfolio(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Portfolio>, Self::Error>> + Send + '_;

  /// Create or replace a portfolio document.
  fn put_portfolio(
    &self,
    portfolio: Portfolio,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Farmer registrations ──────────────────────────────────────────────

  /// Store a complete registration, status `pending`, with its assessment.
  fn register_farmer(
    &self,
    registration: FarmerRegistration,
    risk: RiskAssessment,
  ) -> impl Future<Output = Result<FarmerRecord, Self::Error>> + Send + '_;

  /// Append a document reference. Fails with
  /// [`crate::Error::FarmerNotFound`] for an unknown registration.
  fn add_farmer_document(
    &self,
    farmer_id: Uuid,
    document: FarmerDocument,
  ) -> impl Future<Output = Result<FarmerRecord, Self::Error>> + Send + '_;

  fn list_farmers(
    &self,
  ) -> impl Future<Output = Result<Vec<FarmerRecord>, Self::Error>> + Send + '_;

  fn get_farmer(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<FarmerRecord>, Self::Error>> + Send + '_;
}
