//! Handlers for `/portfolios` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/portfolios/{id}` | `null` when no portfolio has this id |
//! | `PUT`  | `/portfolios/{id}` | Body: [`Portfolio`]; the body id must match the path |

use axum::{Json, body::Bytes, extract::State};
use uniagric_core::{portfolio::Portfolio, store::MarketStore};
use uuid::Uuid;

use crate::{
  ApiState,
  error::{ApiError, parse_json},
  extract::Path,
};

/// `GET /portfolios/{id}`
pub async fn get_one<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Option<Portfolio>>, ApiError>
where
  S: MarketStore,
{
  let portfolio = state.store.get_portfolio(id).await.map_err(ApiError::store)?;
  Ok(Json(portfolio))
}

/// `PUT /portfolios/{id}`
pub async fn put_one<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(id): Path<Uuid>,
  body: Bytes,
) -> Result<Json<Portfolio>, ApiError>
where
  S: MarketStore,
{
  let portfolio: Portfolio = parse_json(&body)?;
  if portfolio.id != id {
    return Err(ApiError::BadRequest(format!(
      "portfolio id {} does not match path id {id}",
      portfolio.id
    )));
  }
  state
    .store
    .put_portfolio(portfolio.clone())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(portfolio))
}
