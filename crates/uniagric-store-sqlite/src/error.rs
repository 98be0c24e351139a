//! Error type for `uniagric-store-sqlite`.

use thiserror::Error;
use uniagric_core::store::DomainError;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] uniagric_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum column held an unrecognised value.
  #[error("unknown {column} value: {value:?}")]
  UnknownValue { column: &'static str, value: String },

  #[error("password hashing error: {0}")]
  PasswordHash(String),
}

impl DomainError for Error {
  fn domain(&self) -> Option<&uniagric_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
