//! Handlers for `/predict` endpoints, forwarded to the prediction service.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/predict/farmer` | Body: [`FarmerPredictionInput`] |
//! | `POST` | `/predict/farm-plan` | Body: [`FarmPlanPredictionInput`] |
//!
//! Upstream failures respond 502.

use axum::{Json, body::Bytes, extract::State};
use uniagric_tools::prediction::{
  FarmPlanPredictionInput, FarmerPredictionInput, PredictionResult,
};

use crate::{
  ApiState,
  error::{ApiError, parse_json},
};

/// `POST /predict/farmer`
pub async fn farmer<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
  let input: FarmerPredictionInput = parse_json(&body)?;
  let result = state.prediction.predict_farmer(&input).await?;
  Ok(Json(result))
}

/// `POST /predict/farm-plan`
pub async fn farm_plan<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
  let input: FarmPlanPredictionInput = parse_json(&body)?;
  let result = state.prediction.predict_farm_plan(&input).await?;
  Ok(Json(result))
}
