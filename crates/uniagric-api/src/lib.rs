//! JSON REST API for Uniagric.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`MarketStore`] and [`IdentityProvider`], any [`FarmTools`], and the
//! prediction, risk and document adapters from `uniagric-tools`. TLS, static
//! files and request tracing are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", uniagric_api::api_router(state))
//! ```

pub mod auth;
pub mod error;
pub mod extract;
pub mod farmers;
pub mod farms;
pub mod investors;
pub mod portfolios;
pub mod predict;
pub mod visualization;


use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use uniagric_core::{
  accounts::Accounts, identity::IdentityProvider, store::MarketStore,
  tools::FarmTools,
};
use uniagric_tools::{DocumentStorage, PredictionClient, RiskClient};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S, T> {
  pub store:      Arc<S>,
  pub tools:      Arc<T>,
  pub prediction: PredictionClient,
  pub risk:       RiskClient,
  pub documents:  Arc<DocumentStorage>,
}

impl<S, T> Clone for ApiState<S, T> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      tools:      self.tools.clone(),
      prediction: self.prediction.clone(),
      risk:       self.risk.clone(),
      documents:  self.documents.clone(),
    }
  }
}

impl<S, T> ApiState<S, T>
where
  S: MarketStore + IdentityProvider,
{
  /// The auth access layer over this state's store.
  pub fn accounts(&self) -> Accounts<S, S> {
    Accounts::new(self.store.clone(), self.store.clone())
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, T>(state: ApiState<S, T>) -> Router<()>
where
  S: MarketStore + IdentityProvider + 'static,
  T: FarmTools + 'static,
{
  Router::new()
    // Farm visualization proxies
    .route(
      "/farm-visualization/companion-crops",
      get(visualization::companion_crops::<S, T>),
    )
    .route(
      "/farm-visualization/planting-method",
      get(visualization::planting_method::<S, T>),
    )
    .route("/farm-visualization/layout", post(visualization::layout::<S, T>))
    .route(
      "/farm-visualization/mixed-layout",
      post(visualization::mixed_layout::<S, T>),
    )
    // Marketplace
    .route("/farms", get(farms::list::<S, T>).post(farms::create::<S, T>))
    .route("/farms/{id}", get(farms::get_one::<S, T>))
    .route("/farms/{id}/invest", post(farms::invest::<S, T>))
    .route("/investors/{id}/investments", get(investors::investments::<S, T>))
    .route("/investors/{id}/distributions", get(investors::distributions::<S, T>))
    .route(
      "/portfolios/{id}",
      get(portfolios::get_one::<S, T>).put(portfolios::put_one::<S, T>),
    )
    // Farmer registrations
    .route("/farmers", get(farmers::list::<S, T>))
    .route("/farmers/register", post(farmers::register::<S, T>))
    .route("/farmers/{id}", get(farmers::get_one::<S, T>))
    .route("/farmers/{id}/documents", post(farmers::upload_document::<S, T>))
    // Auth
    .route("/auth/sign-up", post(auth::sign_up::<S, T>))
    .route("/auth/sign-in", post(auth::sign_in::<S, T>))
    .route("/auth/federated", post(auth::federated::<S, T>))
    .route("/auth/phone", post(auth::start_phone::<S, T>))
    .route("/auth/phone/confirm", post(auth::confirm_phone::<S, T>))
    .route("/auth/password-reset", post(auth::request_password_reset::<S, T>))
    .route(
      "/auth/password-reset/confirm",
      post(auth::confirm_password_reset::<S, T>),
    )
    .route("/users/{uid}/check", get(auth::check::<S, T>))
    .route("/users/{uid}/type", put(auth::reclassify::<S, T>))
    // Predictions
    .route("/predict/farmer", post(predict::farmer::<S, T>))
    .route("/predict/farm-plan", post(predict::farm_plan::<S, T>))
    .with_state(state)
}
