//! Investments and the profit-distribution stubs paired with them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

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
pub enum InvestmentStatus {
  Active,
  Completed,
}

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
pub enum DistributionStatus {
  Pending,
  Paid,
}

/// An investor's capital commitment to one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
  pub id:          Uuid,
  pub farm_id:     Uuid,
  pub investor_id: Uuid,
  pub amount:      f64,
  pub date:        DateTime<Utc>,
  pub status:      InvestmentStatus,
  pub returns:     f64,
}

/// Tracks the eventual payout of returns on an [`Investment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitDistribution {
  pub id:            Uuid,
  pub investment_id: Uuid,
  pub farm_id:       Uuid,
  pub investor_id:   Uuid,
  pub amount:        f64,
  pub date:          DateTime<Utc>,
  pub status:        DistributionStatus,
}

/// Everything written by a single successful investment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentReceipt {
  pub investment:   Investment,
  pub distribution: ProfitDistribution,
}
