//! Farmer registration submissions.
//!
//! A registration is a flat snapshot of three form sections. It is created
//! once, with status `pending` and a risk assessment. Afterwards only
//! supporting documents are appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::risk::RiskAssessment;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
  pub full_name: String,
  pub email:     String,
  pub phone:     String,
  pub id_type:   String,
  pub id_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmProfile {
  pub farm_name:        String,
  pub farm_type:        String,
  pub ownership_type:   String,
  pub farm_location:    String,
  pub land_size:        f64,
  #[serde(default)]
  pub years_operation:  u32,
  #[serde(default)]
  pub main_crops:       String,
  #[serde(default)]
  pub farm_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialInfo {
  pub funding_required:    f64,
  pub funding_purpose:     String,
  pub monthly_returns:     f64,
  pub repayment_time:      String,
  pub funding_description: String,
}

/// The three sections of the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
  Personal,
  Farm,
  Financial,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmerRegistration {
  pub personal_info:  PersonalInfo,
  pub farm_details:   FarmProfile,
  pub financial_info: FinancialInfo,
}

impl FarmerRegistration {
  /// Fields of `section` that are blank or zero, as `section.field` paths.
  pub fn missing_in(&self, section: Section) -> Vec<&'static str> {
    let blank = |s: &str| s.trim().is_empty();
    let unset = |n: f64| !n.is_finite() || n <= 0.0;

    let checks: Vec<(&'static str, bool)> = match section {
      Section::Personal => {
        let p = &self.personal_info;
        vec![
          ("personal_info.full_name", blank(&p.full_name)),
          ("personal_info.email", blank(&p.email)),
          ("personal_info.phone", blank(&p.phone)),
          ("personal_info.id_type", blank(&p.id_type)),
          ("personal_info.id_number", blank(&p.id_number)),
        ]
      }
      Section::Farm => {
        let f = &self.farm_details;
        vec![
          ("farm_details.farm_name", blank(&f.farm_name)),
          ("farm_details.farm_type", blank(&f.farm_type)),
          ("farm_details.ownership_type", blank(&f.ownership_type)),
          ("farm_details.farm_location", blank(&f.farm_location)),
          ("farm_details.land_size", unset(f.land_size)),
        ]
      }
      Section::Financial => {
        let f = &self.financial_info;
        vec![
          ("financial_info.funding_required", unset(f.funding_required)),
          ("financial_info.funding_purpose", blank(&f.funding_purpose)),
          ("financial_info.monthly_returns", unset(f.monthly_returns)),
          ("financial_info.repayment_time", blank(&f.repayment_time)),
          ("financial_info.funding_description", blank(&f.funding_description)),
        ]
      }
    };

    checks
      .into_iter()
      .filter_map(|(name, missing)| missing.then_some(name))
      .collect()
  }

  pub fn is_section_valid(&self, section: Section) -> bool {
    self.missing_in(section).is_empty()
  }

  /// All missing fields across every section, in form order.
  pub fn missing_fields(&self) -> Vec<&'static str> {
    [Section::Personal, Section::Farm, Section::Financial]
      .into_iter()
      .flat_map(|s| self.missing_in(s))
      .collect()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
  Pending,
  Approved,
  Rejected,
}

/// A supporting document uploaded after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerDocument {
  pub filename:     String,
  /// Public URL path of the stored file.
  pub url:          String,
  pub content_type: Option<String>,
  pub upload_date:  DateTime<Utc>,
}

/// A stored registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerRecord {
  pub id:              Uuid,
  #[serde(flatten)]
  pub registration:    FarmerRegistration,
  pub status:          RegistrationStatus,
  #[serde(flatten)]
  pub risk:            RiskAssessment,
  pub assessment_date: DateTime<Utc>,
  /// In upload order.
  #[serde(default)]
  pub documents:       Vec<FarmerDocument>,
  pub created_at:      DateTime<Utc>,
}
