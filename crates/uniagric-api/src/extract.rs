//! Request extractors whose rejections are [`ApiError`]s, so malformed
//! paths and query strings answer with the usual `{"error"}` body.

use axum::{
  extract::{FromRequestParts, Path as AxumPath, Query as AxumQuery},
  http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Query string extractor. A repeated key keeps its first value.
///
/// Values reach `T` as JSON strings, so parameter structs use `String`, or
/// types that deserialize from one such as `Uuid`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &S,
  ) -> Result<Self, Self::Rejection> {
    let AxumQuery(pairs) =
      AxumQuery::<Vec<(String, String)>>::from_request_parts(parts, state)
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut map = Map::new();
    for (key, value) in pairs {
      map.entry(key).or_insert(Value::String(value));
    }

    serde_json::from_value(Value::Object(map))
      .map(Query)
      .map_err(|e| ApiError::BadRequest(format!("invalid query string: {e}")))
  }
}

/// Path parameter extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Path<T>(pub T);

impl<T, S> FromRequestParts<S> for Path<T>
where
  T: DeserializeOwned + Send,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &S,
  ) -> Result<Self, Self::Rejection> {
    AxumPath::<T>::from_request_parts(parts, state)
      .await
      .map(|AxumPath(value)| Path(value))
      .map_err(|e| ApiError::BadRequest(e.body_text()))
  }
}
