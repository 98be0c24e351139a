//! Error types for `uniagric-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// A request or payload failed validation. The message names the
  /// offending field(s).
  #[error("{0}")]
  Invalid(String),

  #[error("farm listing not found: {0}")]
  FarmNotFound(Uuid),

  #[error("farm listing {0} is no longer available")]
  FarmNotAvailable(Uuid),

  #[error("farmer registration not found: {0}")]
  FarmerNotFound(Uuid),

  #[error("investment amount must be a positive number, got {0}")]
  InvalidAmount(f64),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
