//! Auth access layer: identity-service primitives plus the user documents
//! that carry each principal's role.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
  identity::{
    AuthError, Credentials, FederatedProfile, IdentityProvider,
    PhoneConfirmation, validate_email, validate_password,
  },
  store::MarketStore,
  user::{Identity, User, UserCheck, UserType},
};

/// Role given to federated users that did not ask for one.
pub const DEFAULT_FEDERATED_TYPE: UserType = UserType::Investor;

/// Outcome of a federated sign-in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedSignIn {
  pub identity:      Identity,
  pub user:          User,
  /// `true` when this sign-in created the user document.
  pub created:       bool,
  /// The requested role, when it differs from the stored one. The stored
  /// role is left untouched; use [`Accounts::reclassify`] to change it.
  pub type_mismatch: Option<UserType>,
}

/// Combines an [`IdentityProvider`] with a [`MarketStore`].
pub struct Accounts<I, S> {
  identity: Arc<I>,
  store:    Arc<S>,
}

impl<I, S> Clone for Accounts<I, S> {
  fn clone(&self) -> Self {
    Self { identity: self.identity.clone(), store: self.store.clone() }
  }
}

impl<I, S> Accounts<I, S>
where
  I: IdentityProvider,
  S: MarketStore,
{
  pub fn new(identity: Arc<I>, store: Arc<S>) -> Self { Self { identity, store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Create the identity, then the user document keyed by its uid.
  pub async fn sign_up(
    &self,
    email: &str,
    password: &str,
    name: &str,
    user_type: UserType,
  ) -> Result<User, AuthError> {
    validate_email(email)?;
    validate_password(password)?;

    let identity = self
      .identity
      .create_account(email, password, Some(name))
      .await?;

    let user = User {
      uid: identity.uid,
      name: Some(name.to_owned()),
      email: Some(email.to_owned()),
      user_type,
      created_at: Utc::now(),
    };
    self.store.put_user(user.clone()).await.map_err(AuthError::backend)?;

    tracing::info!(uid = %user.uid, %user_type, "user signed up");
    Ok(user)
  }

  pub async fn sign_in(
    &self,
    email: &str,
    password: &str,
  ) -> Result<Identity, AuthError> {
    self.identity.verify_password(email, password).await
  }

  /// Sign in through a federated provider, creating the user document on
  /// first use with `requested` or [`DEFAULT_FEDERATED_TYPE`].
  pub async fn sign_in_federated(
    &self,
    profile: &FederatedProfile,
    requested: Option<UserType>,
  ) -> Result<FederatedSignIn, AuthError> {
    let identity = self.identity.federated_sign_in(profile).await?;

    let existing =
      self.store.get_user(identity.uid).await.map_err(AuthError::backend)?;

    match existing {
      Some(user) => {
        let type_mismatch = requested.filter(|r| *r != user.user_type);
        if let Some(requested) = type_mismatch {
          tracing::warn!(
            uid = %user.uid,
            stored = %user.user_type,
            %requested,
            "federated sign-in requested a different role; not applied"
          );
        }
        Ok(FederatedSignIn { identity, user, created: false, type_mismatch })
      }
      None => {
        let user = User {
          uid:        identity.uid,
          name:       identity.display_name.clone(),
          email:      identity.email.clone(),
          user_type:  requested.unwrap_or(DEFAULT_FEDERATED_TYPE),
          created_at: Utc::now(),
        };
        self.store.put_user(user.clone()).await.map_err(AuthError::backend)?;
        Ok(FederatedSignIn { identity, user, created: true, type_mismatch: None })
      }
    }
  }

  /// Explicitly change a user's stored role.
  ///
  /// The caller re-authenticates as `uid`: a password, or a federated
  /// profile already linked to that user.
  pub async fn reclassify(
    &self,
    uid: Uuid,
    user_type: UserType,
    credentials: &Credentials,
  ) -> Result<(), AuthError> {
    let identity = match credentials {
      Credentials::Password { email, password } => {
        self.identity.verify_password(email, password).await?
      }
      Credentials::Federated(profile) => self
        .identity
        .find_federated(profile)
        .await?
        .ok_or(AuthError::UserMismatch)?,
    };
    if identity.uid != uid {
      tracing::warn!(%uid, presented = %identity.uid, "reclassification refused");
      return Err(AuthError::UserMismatch);
    }

    let updated = self
      .store
      .set_user_type(uid, user_type)
      .await
      .map_err(AuthError::backend)?;
    if !updated {
      return Err(AuthError::UserNotFound);
    }
    tracing::info!(%uid, %user_type, "user reclassified");
    Ok(())
  }

  pub async fn start_phone_sign_in(
    &self,
    phone_number: &str,
  ) -> Result<PhoneConfirmation, AuthError> {
    self.identity.start_phone_sign_in(phone_number).await
  }

  pub async fn confirm_phone_sign_in(
    &self,
    verification_id: Uuid,
    code: &str,
  ) -> Result<Identity, AuthError> {
    self.identity.confirm_phone_sign_in(verification_id, code).await
  }

  pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
    validate_email(email)?;
    self.identity.request_password_reset(email).await
  }

  pub async fn confirm_password_reset(
    &self,
    token: &str,
    new_password: &str,
  ) -> Result<Identity, AuthError> {
    validate_password(new_password)?;
    let identity = self.identity.confirm_password_reset(token, new_password).await?;
    tracing::info!(uid = %identity.uid, "password reset");
    Ok(identity)
  }

  /// Report whether a user document exists and, when `required` is given,
  /// whether its role matches.
  pub async fn check_user(
    &self,
    uid: Uuid,
    required: Option<UserType>,
  ) -> Result<UserCheck, AuthError> {
    let user = self.store.get_user(uid).await.map_err(AuthError::backend)?;
    Ok(UserCheck::evaluate(user.map(|u| u.user_type), required))
  }

  /// The stored role for `uid`, if a user document exists.
  pub async fn user_type(&self, uid: Uuid) -> Result<Option<UserType>, AuthError> {
    let user = self.store.get_user(uid).await.map_err(AuthError::backend)?;
    Ok(user.map(|u| u.user_type))
  }
}
