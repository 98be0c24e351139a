//! HTTP client for the external risk-analysis service.
//!
//! The service receives `{"farmer_data": <registration>}` and answers with a
//! [`RiskAssessment`]. Failures surface as [`RiskError`]; callers that must
//! not fail go through [`uniagric_core::risk::assess_or_default`].

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uniagric_core::{
  registration::FarmerRegistration,
  risk::{RiskAssessment, RiskAssessor},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
  pub url:          String,
  /// Bearer token. Without one every assessment falls back.
  pub api_key:      Option<String>,
  pub timeout_secs: u64,
}

impl Default for RiskConfig {
  fn default() -> Self {
    Self {
      url:          "https://api.reka.ai/analyze".into(),
      api_key:      None,
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Error)]
pub enum RiskError {
  #[error("risk service has no API key configured")]
  NotConfigured,

  #[error("risk request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("risk service returned {status}")]
  Upstream { status: u16 },
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
  farmer_data: &'a FarmerRegistration,
}

#[derive(Clone)]
pub struct RiskClient {
  client: Client,
  config: RiskConfig,
}

impl RiskClient {
  pub fn new(config: RiskConfig) -> Result<Self, RiskError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  pub async fn analyze(
    &self,
    registration: &FarmerRegistration,
  ) -> Result<RiskAssessment, RiskError> {
    let Some(key) = self.config.api_key.as_deref() else {
      return Err(RiskError::NotConfigured);
    };

    let resp = self
      .client
      .post(&self.config.url)
      .bearer_auth(key)
      .json(&AnalyzeRequest { farmer_data: registration })
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      tracing::warn!(%status, "risk service error");
      return Err(RiskError::Upstream { status: status.as_u16() });
    }
    Ok(resp.json().await?)
  }
}

impl RiskAssessor for RiskClient {
  type Error = RiskError;

  async fn assess(
    &self,
    registration: &FarmerRegistration,
  ) -> Result<RiskAssessment, RiskError> {
    self.analyze(registration).await
  }
}
