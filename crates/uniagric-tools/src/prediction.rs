//! Async HTTP client for the prediction service.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

/// Connection settings for the prediction service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
  pub base_url: String,
}

impl Default for PredictionConfig {
  fn default() -> Self { Self { base_url: "http://localhost:8000".into() } }
}

#[derive(Debug, Error)]
pub enum PredictionError {
  #[error("prediction request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("prediction service returned {status}: {detail}")]
  Upstream { status: u16, detail: String },
}

/// Applicant features for the farmer-approval model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerPredictionInput {
  pub years_experience:   u32,
  pub land_size_hectares: f64,
  pub previous_loans:     u32,
  pub credit_score:       f64,
  pub annual_income:      f64,
  pub crop_diversity:     u32,
  pub has_irrigation:     bool,
  pub farm_type:          String,
}

/// Plan features for the farm-plan model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmPlanPredictionInput {
  pub crop_type:         String,
  pub soil_type:         String,
  pub climate:           String,
  pub area_hectares:     f64,
  pub yield_per_hectare: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
  pub prediction:        bool,
  pub probability:       f64,
  #[serde(default)]
  pub recommendations:   Vec<String>,
  #[serde(default)]
  pub visualization_url: Option<String>,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct PredictionClient {
  client: Client,
  config: PredictionConfig,
}

impl PredictionClient {
  pub fn new(config: PredictionConfig) -> Result<Self, PredictionError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// `POST /api/predict/farmer`
  pub async fn predict_farmer(
    &self,
    input: &FarmerPredictionInput,
  ) -> Result<PredictionResult, PredictionError> {
    self.post("/predict/farmer", input).await
  }

  /// `POST /api/predict/farm-plan`
  pub async fn predict_farm_plan(
    &self,
    input: &FarmPlanPredictionInput,
  ) -> Result<PredictionResult, PredictionError> {
    self.post("/predict/farm-plan", input).await
  }

  async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, PredictionError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let resp = self.client.post(self.url(path)).json(body).send().await?;

    let status = resp.status();
    if !status.is_success() {
      let text = resp.text().await.unwrap_or_default();
      let detail = upstream_detail(&text);
      tracing::warn!(path, %status, %detail, "prediction service error");
      return Err(PredictionError::Upstream { status: status.as_u16(), detail });
    }
    Ok(resp.json().await?)
  }
}

/// The `detail` field of an error body, or the raw body.
fn upstream_detail(body: &str) -> String {
  match serde_json::from_str::<Value>(body) {
    Ok(Value::Object(map)) => match map.get("detail") {
      Some(Value::String(s)) => s.clone(),
      Some(other) => other.to_string(),
      None => body.to_owned(),
    },
    _ => body.to_owned(),
  }
}

#[cfg(test)]
mod tests {
  use axum::{Json, Router, http::StatusCode, routing::post};
  use serde_json::json;

  use super::*;

  /// Serve `router` on an ephemeral port and return its base URL.
  async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
  }

  fn farmer_input() -> FarmerPredictionInput {
    FarmerPredictionInput {
      years_experience:   6,
      land_size_hectares: 4.0,
      previous_loans:     1,
      credit_score:       690.0,
      annual_income:      2_400_000.0,
      crop_diversity:     3,
      has_irrigation:     true,
      farm_type:          "crop".into(),
    }
  }

  #[tokio::test]
  async fn farmer_prediction_round_trip() {
    let router = Router::new().route(
      "/api/predict/farmer",
      post(|Json(body): Json<Value>| async move {
        Json(json!({
          "prediction": body["has_irrigation"] == json!(true),
          "probability": 0.82,
          "recommendations": ["Diversify crops"],
          "visualization_url": null,
        }))
      }),
    );
    let base = serve(router).await;
    let client =
      PredictionClient::new(PredictionConfig { base_url: format!("{base}/") }).unwrap();

    let result = client.predict_farmer(&farmer_input()).await.unwrap();
    assert!(result.prediction);
    assert_eq!(result.probability, 0.82);
    assert_eq!(result.recommendations, vec!["Diversify crops".to_owned()]);
    assert_eq!(result.visualization_url, None);
  }

  #[tokio::test]
  async fn upstream_detail_is_reported() {
    let router = Router::new().route(
      "/api/predict/farm-plan",
      post(|| async {
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "detail": "model not loaded" })),
        )
      }),
    );
    let base = serve(router).await;
    let client = PredictionClient::new(PredictionConfig { base_url: base }).unwrap();

    let input = FarmPlanPredictionInput {
      crop_type:         "Maize".into(),
      soil_type:         "loam".into(),
      climate:           "tropical".into(),
      area_hectares:     2.0,
      yield_per_hectare: 3.1,
    };
    match client.predict_farm_plan(&input).await {
      Err(PredictionError::Upstream { status, detail }) => {
        assert_eq!(status, 500);
        assert_eq!(detail, "model not loaded");
      }
      other => panic!("expected upstream error, got {other:?}"),
    }
  }

  #[test]
  fn detail_falls_back_to_body() {
    assert_eq!(upstream_detail("Bad Gateway"), "Bad Gateway");
    assert_eq!(upstream_detail(r#"{"detail":[1]}"#), "[1]");
    assert_eq!(upstream_detail(r#"{"message":"x"}"#), r#"{"message":"x"}"#);
  }
}
