//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use uniagric_core::{
  identity::AuthError,
  store::DomainError,
  tools::{Capability, ToolError},
};
use uniagric_tools::{DocumentError, PredictionError};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("{capability:?} failed: {source}")]
  Tool {
    capability: Capability,
    #[source]
    source:     ToolError,
  },

  #[error(transparent)]
  Auth(#[from] AuthError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("prediction service error: {0}")]
  Prediction(#[from] PredictionError),

  #[error("document storage error: {0}")]
  Document(#[from] DocumentError),
}

impl ApiError {
  /// Classify a store error by the domain condition it carries, if any.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + DomainError + Send + Sync + 'static,
  {
    use uniagric_core::Error as Domain;
    match e.domain() {
      Some(Domain::FarmNotFound(id)) => Self::NotFound(format!("farm {id} not found")),
      Some(Domain::FarmerNotFound(id)) => Self::NotFound(format!("farmer {id} not found")),
      Some(d @ Domain::FarmNotAvailable(_)) => Self::Conflict(d.to_string()),
      Some(d @ (Domain::Invalid(_) | Domain::InvalidAmount(_))) => {
        Self::BadRequest(d.to_string())
      }
      _ => Self::Store(Box::new(e)),
    }
  }

  pub fn tool(capability: Capability, source: ToolError) -> Self {
    Self::Tool { capability, source }
  }

  /// A validation failure from the domain layer.
  pub fn invalid(e: uniagric_core::Error) -> Self { Self::BadRequest(e.to_string()) }
}

/// Deserialize a JSON request body, reporting failures as 400s.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
  serde_json::from_slice(body)
    .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))
}

fn auth_status(e: &AuthError) -> StatusCode {
  match e {
    AuthError::EmailAlreadyInUse => StatusCode::CONFLICT,
    AuthError::InvalidEmail
    | AuthError::WeakPassword
    | AuthError::InvalidPhoneNumber
    | AuthError::InvalidVerificationCode
    | AuthError::InvalidActionCode => StatusCode::BAD_REQUEST,
    AuthError::UserNotFound => StatusCode::NOT_FOUND,
    AuthError::WrongPassword => StatusCode::UNAUTHORIZED,
    AuthError::UserMismatch => StatusCode::FORBIDDEN,
    AuthError::AccountExistsWithDifferentCredential => StatusCode::CONFLICT,
    AuthError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Tool { capability, source } => {
        tracing::error!(?capability, error = %source, "farm tool failed");
        let message = match source {
          ToolError::InvalidOutput { .. } => "Invalid script output format",
          ToolError::MissingOutput(_) => capability.missing_output_message(),
          _ => capability.failure_message(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, message.to_owned())
      }
      ApiError::Auth(e) => {
        if let AuthError::Backend(inner) = e {
          tracing::error!(error = %inner, "auth backend failure");
        }
        let body = json!({ "error": e.user_message(), "code": e.code() });
        return (auth_status(e), Json(body)).into_response();
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
      }
      ApiError::Prediction(e) => {
        tracing::error!(error = %e, "prediction service failure");
        let message = match e {
          PredictionError::Upstream { detail, .. } => detail.clone(),
          PredictionError::Http(_) => "prediction service unavailable".to_owned(),
        };
        (StatusCode::BAD_GATEWAY, message)
      }
      ApiError::Document(e @ DocumentError::InvalidFileName(_)) => {
        (StatusCode::BAD_REQUEST, e.to_string())
      }
      ApiError::Document(e) => {
        tracing::error!(error = %e, "document upload failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Document upload failed".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
