//! Handlers for `/auth` and `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/sign-up` | Body: `{"email","password","name","userType"}`; returns 201 + user |
//! | `POST` | `/auth/sign-in` | Body: `{"email","password"}`; returns the identity |
//! | `POST` | `/auth/federated` | Body: [`FederatedProfile`] plus optional `userType` |
//! | `POST` | `/auth/phone` | Body: `{"phoneNumber"}`; sends a code |
//! | `POST` | `/auth/phone/confirm` | Body: `{"verificationId","code"}` |
//! | `POST` | `/auth/password-reset` | Body: `{"email"}`; sends a reset token, 204 |
//! | `POST` | `/auth/password-reset/confirm` | Body: `{"token","newPassword"}`; returns the identity |
//! | `GET`  | `/users/{uid}/check` | Optional `?type=farmer\|investor` |
//! | `PUT`  | `/users/{uid}/type` | Body: `{"userType","credentials"}`; re-authenticated reclassification |
//!
//! Auth failures respond with `{"error": <message>, "code": "auth/..."}`.

use axum::{
  Json,
  body::Bytes,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uniagric_core::{
  accounts::FederatedSignIn,
  identity::{Credentials, FederatedProfile, IdentityProvider, PhoneConfirmation},
  store::MarketStore,
  user::{Identity, UserCheck, UserType},
};
use uuid::Uuid;

use crate::{
  ApiState,
  error::{ApiError, parse_json},
  extract::{Path, Query},
};

// ─── Email and password ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpBody {
  pub email:     String,
  pub password:  String,
  pub name:      String,
  pub user_type: UserType,
}

/// `POST /auth/sign-up`
pub async fn sign_up<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore + IdentityProvider,
{
  let body: SignUpBody = parse_json(&body)?;
  let user = state
    .accounts()
    .sign_up(&body.email, &body.password, &body.name, body.user_type)
    .await?;
  Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
pub struct SignInBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/sign-in`
pub async fn sign_in<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<Json<Identity>, ApiError>
where
  S: MarketStore + IdentityProvider,
{
  let body: SignInBody = parse_json(&body)?;
  let identity = state.accounts().sign_in(&body.email, &body.password).await?;
  Ok(Json(identity))
}

// ─── Federated ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedBody {
  #[serde(flatten)]
  pub profile:   FederatedProfile,
  pub user_type: Option<UserType>,
}

/// `POST /auth/federated`
pub async fn federated<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<Json<FederatedSignIn>, ApiError>
where
  S: MarketStore + IdentityProvider,
{
  let body: FederatedBody = parse_json(&body)?;
  let outcome = state
    .accounts()
    .sign_in_federated(&body.profile, body.user_type)
    .await?;
  Ok(Json(outcome))
}

// ─── Phone ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneBody {
  pub phone_number: String,
}

/// `POST /auth/phone`
pub async fn start_phone<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<Json<PhoneConfirmation>, ApiError>
where
  S: MarketStore + IdentityProvider,
{
  let body: PhoneBody = parse_json(&body)?;
  let confirmation = state
    .accounts()
    .start_phone_sign_in(&body.phone_number)
    .await?;
  Ok(Json(confirmation))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBody {
  pub verification_id: Uuid,
  pub code:            String,
}

/// `POST /auth/phone/confirm`
pub async fn confirm_phone<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<Json<Identity>, ApiError>
where
  S: MarketStore + IdentityProvider,
{
  let body: ConfirmBody = parse_json(&body)?;
  let identity = state
    .accounts()
    .confirm_phone_sign_in(body.verification_id, &body.code)
    .await?;
  Ok(Json(identity))
}

// ─── Password reset ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResetBody {
  pub email: String,
}

/// `POST /auth/password-reset`
pub async fn request_password_reset<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<StatusCode, ApiError>
where
  S: MarketStore + IdentityProvider,
{
  let body: ResetBody = parse_json(&body)?;
  state.accounts().request_password_reset(&body.email).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetConfirmBody {
  pub token:        String,
  pub new_password: String,
}

/// `POST /auth/password-reset/confirm`
pub async fn confirm_password_reset<S, T>(
  State(state): State<ApiState<S, T>>,
  body: Bytes,
) -> Result<Json<Identity>, ApiError>
where
  S: MarketStore + IdentityProvider,
{
  let body: ResetConfirmBody = parse_json(&body)?;
  let identity = state
    .accounts()
    .confirm_password_reset(&body.token, &body.new_password)
    .await?;
  Ok(Json(identity))
}

// ─── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckParams {
  #[serde(rename = "type")]
  pub user_type: Option<String>,
}

/// `GET /users/{uid}/check[?type=<type>]`
pub async fn check<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(uid): Path<Uuid>,
  Query(params): Query<CheckParams>,
) -> Result<Json<UserCheck>, ApiError>
where
  S: MarketStore + IdentityProvider,
{
  let required = params
    .user_type
    .as_deref()
    .map(|t| {
      t.parse::<UserType>()
        .map_err(|_| ApiError::BadRequest(format!("unknown user type: {t}")))
    })
    .transpose()?;
  let check = state.accounts().check_user(uid, required).await?;
  Ok(Json(check))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclassifyBody {
  pub user_type:   UserType,
  /// Proof that the caller is `uid`.
  pub credentials: Credentials,
}

/// `PUT /users/{uid}/type`
pub async fn reclassify<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(uid): Path<Uuid>,
  body: Bytes,
) -> Result<StatusCode, ApiError>
where
  S: MarketStore + IdentityProvider,
{
  let body: ReclassifyBody = parse_json(&body)?;
  state
    .accounts()
    .reclassify(uid, body.user_type, &body.credentials)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}
