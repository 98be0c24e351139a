//! Handlers for `/farms` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/farms` | Available listings, newest first. `?farmerId=` lists one farmer's listings instead |
//! | `POST` | `/farms` | Body: `{"farmerId": ..., ...FarmDetails}`; returns 201 + listing |
//! | `GET`  | `/farms/{id}` | 404 if not found |
//! | `POST` | `/farms/{id}/invest` | Body: `{"investorId": ..., "amount": ...}`; returns 201 + receipt |

use axum::{
  Json,
  body::Bytes,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uniagric_core::{
  farm::{FarmDetails, FarmListing},
  store::MarketStore,
};
use uuid::Uuid;

use crate::{
  ApiState,
  error::{ApiError, parse_json},
  extract::{Path, Query},
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  pub farmer_id: Option<Uuid>,
}

/// `GET /farms[?farmerId=<id>]`
pub async fn list<S, T>(
  State(state): State<ApiState<S, T>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<FarmListing>>, ApiError>
where
  S: MarketStore,
{
  let farms = match params.farmer_id {
    Some(farmer_id) => state
      .store
      .list_farms_by_farmer(farmer_id)
      .await
      .map_err(ApiError::store)?,
    None => {
      let rx = state
        .store
        .watch_available_farms()
        .await
        .map_err(ApiError::store)?;
      let snapshot = rx.borrow().clone();
      snapshot
    }
  };
  Ok(Json(farms))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub farmer_id: Uuid,
  #[serde(flatten)]
  pub details:   FarmDetails,
}

/// `POST /farms`
pub async fn create<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
{
  let body: CreateBody = parse_json(&body)?;
  let listing = state
    .store
    .create_farm(body.farmer_id, body.details)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(listing)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /farms/{id}`
pub async fn get_one<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(id): Path<Uuid>,
) -> Result<Json<FarmListing>, ApiError>
where
  S: MarketStore,
{
  let farm = state
    .store
    .get_farm(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("farm {id} not found")))?;
  Ok(Json(farm))
}

// ─── Invest ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestBody {
  pub investor_id: Uuid,
  pub amount:      f64,
}

/// `POST /farms/{id}/invest`
pub async fn invest<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(id): Path<Uuid>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
{
  let body: InvestBody = parse_json(&body)?;
  let receipt = state
    .store
    .invest(id, body.investor_id, body.amount)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(receipt)))
}
