//! Portfolios: curated, read-only groupings of listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortfolioStatus {
  Active,
  Pending,
  Completed,
}

/// One listing's share of a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmAllocation {
  pub id:         Uuid,
  pub name:       String,
  /// Share of the portfolio, in percent.
  pub allocation: f64,
  pub status:     String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
  pub id:               Uuid,
  pub title:            String,
  pub status:           PortfolioStatus,
  pub total_investment: f64,
  pub current_value:    f64,
  pub return_rate:      f64,
  /// Ordered as curated; order is preserved by the store.
  pub farms:            Vec<FarmAllocation>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}
