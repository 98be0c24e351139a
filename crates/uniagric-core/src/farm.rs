//! Farm listings: a farmer's fundable project as shown to investors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Listing lifecycle. The only transition is `Available → Invested`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FarmStatus {
  Available,
  Invested,
}

/// The farmer-supplied part of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmDetails {
  pub farm_name:         String,
  pub location:          String,
  /// Farm size in acres.
  pub size:              f64,
  pub investment_needed: f64,
  pub risk_category:     String,
  #[serde(default)]
  pub description:       String,
  pub crop_type:         String,
  pub expected_yield:    f64,
  /// Expected annual return, in percent.
  pub return_rate:       f64,
}

impl FarmDetails {
  /// Reject listings that could never be funded or displayed.
  pub fn validate(&self) -> Result<()> {
    let mut missing = Vec::new();
    if self.farm_name.trim().is_empty() {
      missing.push("farmName");
    }
    if self.location.trim().is_empty() {
      missing.push("location");
    }
    if self.crop_type.trim().is_empty() {
      missing.push("cropType");
    }
    if self.risk_category.trim().is_empty() {
      missing.push("riskCategory");
    }
    if !missing.is_empty() {
      return Err(Error::Invalid(format!(
        "missing required fields: {}",
        missing.join(", ")
      )));
    }

    for (name, value) in [
      ("size", self.size),
      ("investmentNeeded", self.investment_needed),
    ] {
      if !value.is_finite() || value <= 0.0 {
        return Err(Error::Invalid(format!("{name} must be a positive number")));
      }
    }
    for (name, value) in [
      ("expectedYield", self.expected_yield),
      ("returnRate", self.return_rate),
    ] {
      if !value.is_finite() || value < 0.0 {
        return Err(Error::Invalid(format!(
          "{name} must be a non-negative number"
        )));
      }
    }
    Ok(())
  }
}

/// A persisted listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmListing {
  pub id:          Uuid,
  pub farmer_id:   Uuid,
  #[serde(flatten)]
  pub details:     FarmDetails,
  pub status:      FarmStatus,
  pub created_at:  DateTime<Utc>,
  /// Set when the listing moves to [`FarmStatus::Invested`].
  pub investor_id: Option<Uuid>,
  pub invested_at: Option<DateTime<Utc>>,
}

impl FarmListing {
  pub fn is_available(&self) -> bool { self.status == FarmStatus::Available }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn details() -> FarmDetails {
    FarmDetails {
      farm_name:         "Green Acres".into(),
      location:          "Kaduna".into(),
      size:              12.5,
      investment_needed: 5_000.0,
      risk_category:     "Medium".into(),
      description:       "Irrigated maize".into(),
      crop_type:         "Maize".into(),
      expected_yield:    30.0,
      return_rate:       12.0,
    }
  }

  #[test]
  fn valid_details_pass() { assert!(details().validate().is_ok()); }

  #[test]
  fn blank_names_are_reported_together() {
    let mut d = details();
    d.farm_name = " ".into();
    d.crop_type = String::new();
    let err = d.validate().unwrap_err().to_string();
    assert!(err.contains("farmName"), "{err}");
    assert!(err.contains("cropType"), "{err}");
  }

  #[test]
  fn non_positive_investment_is_rejected() {
    let mut d = details();
    d.investment_needed = 0.0;
    assert!(d.validate().is_err());
    d.investment_needed = f64::NAN;
    assert!(d.validate().is_err());
  }

  #[test]
  fn listing_flattens_details_in_json() {
    let listing = FarmListing {
      id:          Uuid::nil(),
      farmer_id:   Uuid::nil(),
      details:     details(),
      status:      FarmStatus::Available,
      created_at:  Utc::now(),
      investor_id: None,
      invested_at: None,
    };
    let json = serde_json::to_value(&listing).unwrap();
    assert_eq!(json["farmName"], "Green Acres");
    assert_eq!(json["status"], "available");
    assert!(json.get("details").is_none());
  }
}
