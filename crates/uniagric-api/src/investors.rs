//! Handlers for `/investors` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/investors/{id}/investments` | Newest first |
//! | `GET`  | `/investors/{id}/distributions` | Newest first |

use axum::{Json, extract::State};
use uniagric_core::{
  investment::{Investment, ProfitDistribution},
  store::MarketStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, extract::Path};

/// `GET /investors/{id}/investments`
pub async fn investments<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(investor_id): Path<Uuid>,
) -> Result<Json<Vec<Investment>>, ApiError>
where
  S: MarketStore,
{
  let investments = state
    .store
    .investments_for(investor_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(investments))
}

/// `GET /investors/{id}/distributions`
pub async fn distributions<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(investor_id): Path<Uuid>,
) -> Result<Json<Vec<ProfitDistribution>>, ApiError>
where
  S: MarketStore,
{
  let distributions = state
    .store
    .distributions_for(investor_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(distributions))
}
