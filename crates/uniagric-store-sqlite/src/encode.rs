//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 (nanoseconds, `Z`) so that text
//! ordering matches time ordering. UUIDs are hyphenated lowercase strings.
//! Enum columns use the lowercase names shared with the JSON API.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use uniagric_core::{
  farm::{FarmDetails, FarmListing},
  investment::{Investment, ProfitDistribution},
  registration::{FarmerRecord, RegistrationStatus},
  risk::RiskAssessment,
  user::{Identity, User},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ──────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

pub fn encode_registration_status(s: RegistrationStatus) -> &'static str {
  match s {
    RegistrationStatus::Pending => "pending",
    RegistrationStatus::Approved => "approved",
    RegistrationStatus::Rejected => "rejected",
  }
}

pub fn decode_registration_status(s: &str) -> Result<RegistrationStatus> {
  match s {
    "pending" => Ok(RegistrationStatus::Pending),
    "approved" => Ok(RegistrationStatus::Approved),
    "rejected" => Ok(RegistrationStatus::Rejected),
    other => Err(Error::UnknownValue {
      column: "farmer_registrations.status",
      value:  other.to_owned(),
    }),
  }
}

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// Column list matching [`RawFarm::from_row`].
pub const FARM_COLUMNS: &str = "id, farmer_id, farm_name, location, size,
  investment_needed, risk_category, description, crop_type, expected_yield,
  return_rate, status, created_at, investor_id, invested_at";

pub struct RawFarm {
  pub id:                String,
  pub farmer_id:         String,
  pub farm_name:         String,
  pub location:          String,
  pub size:              f64,
  pub investment_needed: f64,
  pub risk_category:     String,
  pub description:       String,
  pub crop_type:         String,
  pub expected_yield:    f64,
  pub return_rate:       f64,
  pub status:            String,
  pub created_at:        String,
  pub investor_id:       Option<String>,
  pub invested_at:       Option<String>,
}

impl RawFarm {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      farmer_id:         row.get(1)?,
      farm_name:         row.get(2)?,
      location:          row.get(3)?,
      size:              row.get(4)?,
      investment_needed: row.get(5)?,
      risk_category:     row.get(6)?,
      description:       row.get(7)?,
      crop_type:         row.get(8)?,
      expected_yield:    row.get(9)?,
      return_rate:       row.get(10)?,
      status:            row.get(11)?,
      created_at:        row.get(12)?,
      investor_id:       row.get(13)?,
      invested_at:       row.get(14)?,
    })
  }

  pub fn into_listing(self) -> Result<FarmListing> {
    Ok(FarmListing {
      id:          decode_uuid(&self.id)?,
      farmer_id:   decode_uuid(&self.farmer_id)?,
      details:     FarmDetails {
        farm_name:         self.farm_name,
        location:          self.location,
        size:              self.size,
        investment_needed: self.investment_needed,
        risk_category:     self.risk_category,
        description:       self.description,
        crop_type:         self.crop_type,
        expected_yield:    self.expected_yield,
        return_rate:       self.return_rate,
      },
      status:      decode_enum("farm_listings.status", &self.status)?,
      created_at:  decode_dt(&self.created_at)?,
      investor_id: self.investor_id.as_deref().map(decode_uuid).transpose()?,
      invested_at: self.invested_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub struct RawInvestment {
  pub id:          String,
  pub farm_id:     String,
  pub investor_id: String,
  pub amount:      f64,
  pub date:        String,
  pub status:      String,
  pub returns:     f64,
}

impl RawInvestment {
  pub fn into_investment(self) -> Result<Investment> {
    Ok(Investment {
      id:          decode_uuid(&self.id)?,
      farm_id:     decode_uuid(&self.farm_id)?,
      investor_id: decode_uuid(&self.investor_id)?,
      amount:      self.amount,
      date:        decode_dt(&self.date)?,
      status:      decode_enum("investments.status", &self.status)?,
      returns:     self.returns,
    })
  }
}

pub struct RawDistribution {
  pub id:            String,
  pub investment_id: String,
  pub farm_id:       String,
  pub investor_id:   String,
  pub amount:        f64,
  pub date:          String,
  pub status:        String,
}

impl RawDistribution {
  pub fn into_distribution(self) -> Result<ProfitDistribution> {
    Ok(ProfitDistribution {
      id:            decode_uuid(&self.id)?,
      investment_id: decode_uuid(&self.investment_id)?,
      farm_id:       decode_uuid(&self.farm_id)?,
      investor_id:   decode_uuid(&self.investor_id)?,
      amount:        self.amount,
      date:          decode_dt(&self.date)?,
      status:        decode_enum("profit_distributions.status", &self.status)?,
    })
  }
}

pub struct RawUser {
  pub uid:        String,
  pub name:       Option<String>,
  pub email:      Option<String>,
  pub user_type:  String,
  pub created_at: String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      uid:        decode_uuid(&self.uid)?,
      name:       self.name,
      email:      self.email,
      user_type:  decode_enum("users.user_type", &self.user_type)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawIdentity {
  pub uid:          String,
  pub email:        Option<String>,
  pub display_name: Option<String>,
  pub phone_number: Option<String>,
}

impl RawIdentity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uid:          row.get(0)?,
      email:        row.get(1)?,
      display_name: row.get(2)?,
      phone_number: row.get(3)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      uid:          decode_uuid(&self.uid)?,
      email:        self.email,
      display_name: self.display_name,
      phone_number: self.phone_number,
    })
  }
}

/// Column list matching [`RawFarmer::from_row`].
pub const FARMER_COLUMNS: &str = "id, registration_json, status, risk_level,
  risk_score, assessment_reason, assessment_date, documents_json, created_at";

pub struct RawFarmer {
  pub id:                String,
  pub registration_json: String,
  pub status:            String,
  pub risk_level:        String,
  pub risk_score:        f64,
  pub assessment_reason: Option<String>,
  pub assessment_date:   String,
  pub documents_json:    String,
  pub created_at:        String,
}

impl RawFarmer {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      registration_json: row.get(1)?,
      status:            row.get(2)?,
      risk_level:        row.get(3)?,
      risk_score:        row.get(4)?,
      assessment_reason: row.get(5)?,
      assessment_date:   row.get(6)?,
      documents_json:    row.get(7)?,
      created_at:        row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<FarmerRecord> {
    Ok(FarmerRecord {
      id:              decode_uuid(&self.id)?,
      registration:    serde_json::from_str(&self.registration_json)?,
      status:          decode_registration_status(&self.status)?,
      risk:            RiskAssessment {
        risk_level:        self.risk_level,
        risk_score:        self.risk_score,
        assessment_reason: self.assessment_reason,
      },
      assessment_date: decode_dt(&self.assessment_date)?,
      documents:       serde_json::from_str(&self.documents_json)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use uniagric_core::farm::FarmStatus;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width_and_sortable() {
    let a = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let b = Utc.timestamp_opt(1_700_000_000, 120_000_001).unwrap();
    let (ea, eb) = (encode_dt(a), encode_dt(b));
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb);
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }

  #[test]
  fn unknown_enum_value_is_reported() {
    let err = decode_enum::<FarmStatus>("farm_listings.status", "sold")
      .unwrap_err()
      .to_string();
    assert!(err.contains("sold"), "{err}");
  }
}
