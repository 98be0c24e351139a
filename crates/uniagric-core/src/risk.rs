//! Risk scoring for farmer registrations.
//!
//! Every stored registration carries an assessment. When the assessor is
//! unreachable or returns something unusable, [`assess_or_default`] records
//! [`RiskAssessment::fallback`] instead of failing the registration.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::registration::FarmerRegistration;

pub const FALLBACK_RISK_LEVEL: &str = "Medium";
pub const FALLBACK_RISK_SCORE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
  /// e.g. `Low`, `Medium`, `High`
  pub risk_level:        String,
  pub risk_score:        f64,
  #[serde(default)]
  pub assessment_reason: Option<String>,
}

impl RiskAssessment {
  pub fn fallback(reason: impl Into<String>) -> Self {
    Self {
      risk_level:        FALLBACK_RISK_LEVEL.to_owned(),
      risk_score:        FALLBACK_RISK_SCORE,
      assessment_reason: Some(reason.into()),
    }
  }

  fn is_usable(&self) -> bool {
    !self.risk_level.trim().is_empty() && self.risk_score.is_finite()
  }
}

/// Scores a registration before it is stored.
pub trait RiskAssessor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn assess<'a>(
    &'a self,
    registration: &'a FarmerRegistration,
  ) -> impl Future<Output = Result<RiskAssessment, Self::Error>> + Send + 'a;
}

/// Run `assessor`, substituting the fallback assessment on any failure.
pub async fn assess_or_default<A: RiskAssessor>(
  assessor: &A,
  registration: &FarmerRegistration,
) -> RiskAssessment {
  match assessor.assess(registration).await {
    Ok(assessment) if assessment.is_usable() => assessment,
    Ok(assessment) => {
      tracing::warn!(?assessment, "unusable risk assessment; using default");
      RiskAssessment::fallback("Default assessment due to an unusable response")
    }
    Err(e) => {
      tracing::warn!(error = %e, "risk assessment failed; using default");
      RiskAssessment::fallback(format!("Default assessment due to error: {e}"))
    }
  }
}
