//! Users, identities and the farmer/investor role attribute.
//!
//! An [`Identity`] is what the identity service knows about a principal. A
//! [`User`] is the document-store record keyed by the same `uid`, carrying
//! the role used to gate farmer- and investor-only pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role a user signed up as.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserType {
  Farmer,
  Investor,
}

/// A principal as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
  pub uid:          Uuid,
  pub email:        Option<String>,
  pub display_name: Option<String>,
  pub phone_number: Option<String>,
}

/// The user document, keyed by the identity's `uid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub uid:        Uuid,
  pub name:       Option<String>,
  pub email:      Option<String>,
  pub user_type:  UserType,
  pub created_at: DateTime<Utc>,
}

/// Result of a role guard check against the user documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCheck {
  pub exists:       bool,
  pub correct_type: bool,
  pub current_type: Option<UserType>,
}

impl UserCheck {
  /// Evaluate a stored role against an optional required role.
  pub fn evaluate(stored: Option<UserType>, required: Option<UserType>) -> Self {
    match stored {
      None => Self { exists: false, correct_type: false, current_type: None },
      Some(current) => Self {
        exists:       true,
        correct_type: required.is_none_or(|r| r == current),
        current_type: Some(current),
      },
    }
  }
}
