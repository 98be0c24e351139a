//! Handlers for `/farm-visualization` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/farm-visualization/companion-crops` | `?crop&state&soilType` |
//! | `GET`  | `/farm-visualization/planting-method` | `?cropType&soilType&areaAcres&primaryCrop` |
//! | `POST` | `/farm-visualization/layout` | Body: [`LayoutRequest`]; returns `{"imageUrl"}` |
//! | `POST` | `/farm-visualization/mixed-layout` | Body: [`MixedLayoutRequest`]; returns `{"imageUrl"}` |
//!
//! Lookups return the tool's JSON document unmodified.

use axum::{Json, body::Bytes, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use uniagric_core::tools::{
  Capability, CompanionCropQuery, FarmTools, LayoutRequest, MixedLayoutRequest,
  PlantingMethodQuery,
};

use crate::{
  ApiState,
  error::{ApiError, parse_json},
  extract::Query,
};

/// Fail with every parameter that is absent or blank.
fn require(params: &[(&str, Option<&str>)]) -> Result<(), ApiError> {
  let missing: Vec<&str> = params
    .iter()
    .filter(|(_, v)| v.is_none_or(|s| s.trim().is_empty()))
    .map(|(name, _)| *name)
    .collect();
  if missing.is_empty() {
    Ok(())
  } else {
    Err(ApiError::BadRequest(format!(
      "Missing required parameters: {}",
      missing.join(", ")
    )))
  }
}

// ─── Companion crops ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionParams {
  pub crop:      Option<String>,
  pub state:     Option<String>,
  pub soil_type: Option<String>,
}

/// `GET /farm-visualization/companion-crops?crop=&state=&soilType=`
pub async fn companion_crops<S, T>(
  State(state): State<ApiState<S, T>>,
  Query(params): Query<CompanionParams>,
) -> Result<Json<Value>, ApiError>
where
  T: FarmTools,
{
  require(&[
    ("crop", params.crop.as_deref()),
    ("state", params.state.as_deref()),
    ("soilType", params.soil_type.as_deref()),
  ])?;
  let query = CompanionCropQuery {
    crop:      params.crop.unwrap_or_default(),
    state:     params.state.unwrap_or_default(),
    soil_type: params.soil_type.unwrap_or_default(),
  };

  let value = state
    .tools
    .companion_crops(&query)
    .await
    .map_err(|e| ApiError::tool(Capability::CompanionCrops, e))?;
  Ok(Json(value))
}

// ─── Planting method ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantingParams {
  pub crop_type:    Option<String>,
  pub soil_type:    Option<String>,
  pub area_acres:   Option<String>,
  pub primary_crop: Option<String>,
}

/// `GET /farm-visualization/planting-method?cropType=&soilType=&areaAcres=&primaryCrop=`
pub async fn planting_method<S, T>(
  State(state): State<ApiState<S, T>>,
  Query(params): Query<PlantingParams>,
) -> Result<Json<Value>, ApiError>
where
  T: FarmTools,
{
  require(&[
    ("cropType", params.crop_type.as_deref()),
    ("soilType", params.soil_type.as_deref()),
    ("areaAcres", params.area_acres.as_deref()),
    ("primaryCrop", params.primary_crop.as_deref()),
  ])?;
  let area_acres = params
    .area_acres
    .as_deref()
    .and_then(|s| s.trim().parse::<f64>().ok())
    .filter(|a| a.is_finite())
    .ok_or_else(|| ApiError::BadRequest("areaAcres must be a valid number".into()))?;

  let query = PlantingMethodQuery {
    crop_type: params.crop_type.unwrap_or_default(),
    soil_type: params.soil_type.unwrap_or_default(),
    area_acres,
    primary_crop: params.primary_crop.unwrap_or_default(),
  };

  let value = state
    .tools
    .planting_method(&query)
    .await
    .map_err(|e| ApiError::tool(Capability::PlantingMethod, e))?;
  Ok(Json(value))
}

// ─── Layouts ──────────────────────────────────────────────────────────────────

/// `POST /farm-visualization/layout`
pub async fn layout<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError>
where
  T: FarmTools,
{
  let request: LayoutRequest = parse_json(&body)?;
  request.validate().map_err(ApiError::invalid)?;

  let image = state
    .tools
    .render_layout(&request)
    .await
    .map_err(|e| ApiError::tool(Capability::FarmLayout, e))?;
  Ok(Json(json!({ "imageUrl": image.image_url })))
}

/// `POST /farm-visualization/mixed-layout`
pub async fn mixed_layout<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<Json<Value>, ApiError>
where
  T: FarmTools,
{
  let request: MixedLayoutRequest = parse_json(&body)?;
  request.validate().map_err(ApiError::invalid)?;

  let image = state
    .tools
    .render_mixed_layout(&request)
    .await
    .map_err(|e| ApiError::tool(Capability::MixedLayout, e))?;
  Ok(Json(json!({ "imageUrl": image.image_url })))
}
