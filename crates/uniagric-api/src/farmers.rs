//! Handlers for `/farmers` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/farmers/register` | Body: [`FarmerRegistration`]; risk-assessed, returns 201 + record |
//! | `GET`  | `/farmers` | All registrations, newest first |
//! | `GET`  | `/farmers/{id}` | 404 if not found |
//! | `POST` | `/farmers/{id}/documents` | Multipart field `file`; returns 201 + document |

use axum::{
  Json,
  body::Bytes,
  extract::{
    Multipart, State,
    multipart::{MultipartError, MultipartRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use uniagric_core::{
  registration::{FarmerDocument, FarmerRecord, FarmerRegistration},
  risk::assess_or_default,
  store::MarketStore,
};
use uuid::Uuid;

use crate::{
  ApiState,
  error::{ApiError, parse_json},
  extract::Path,
};

/// `POST /farmers/register`
pub async fn register<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
{
  let registration: FarmerRegistration = parse_json(&body)?;
  let missing = registration.missing_fields();
  if !missing.is_empty() {
    return Err(ApiError::BadRequest(format!(
      "Missing required fields: {}",
      missing.join(", ")
    )));
  }

  let risk = assess_or_default(&state.risk, &registration).await;
  let record = state
    .store
    .register_farmer(registration, risk)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /farmers`
pub async fn list<S, T>(
  State(state): State<ApiState<S, T>>,
) -> Result<Json<Vec<FarmerRecord>>, ApiError>
where
  S: MarketStore,
{
  let farmers = state.store.list_farmers().await.map_err(ApiError::store)?;
  Ok(Json(farmers))
}

/// `GET /farmers/{id}`
pub async fn get_one<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(id): Path<Uuid>,
) -> Result<Json<FarmerRecord>, ApiError>
where
  S: MarketStore,
{
  let farmer = state
    .store
    .get_farmer(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("farmer {id} not found")))?;
  Ok(Json(farmer))
}

/// `POST /farmers/{id}/documents`
pub async fn upload_document<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(id): Path<Uuid>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
{
  let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

  // Refuse before writing anything to disk.
  if state.store.get_farmer(id).await.map_err(ApiError::store)?.is_none() {
    return Err(ApiError::NotFound(format!("farmer {id} not found")));
  }

  let bad_form = |e: MultipartError| ApiError::BadRequest(e.body_text());
  let mut upload = None;
  while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
    if field.name() != Some("file") {
      continue;
    }
    let file_name = field.file_name().unwrap_or_default().to_owned();
    let content_type = field.content_type().map(str::to_owned);
    let bytes = field.bytes().await.map_err(bad_form)?;
    upload = Some((file_name, content_type, bytes));
    break;
  }
  let Some((file_name, content_type, bytes)) = upload else {
    return Err(ApiError::BadRequest("Missing multipart field: file".into()));
  };

  let stored = state.documents.save(id, &file_name, &bytes).await?;
  let document = FarmerDocument {
    filename:     stored.file_name,
    url:          stored.url,
    content_type,
    upload_date:  Utc::now(),
  };
  state
    .store
    .add_farmer_document(id, document.clone())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(document)))
}
