//! The `IdentityProvider` trait and its native error conditions.
//!
//! Identity errors carry stable codes (`auth/...`) so clients can map them to
//! their own wording; [`AuthError::user_message`] provides the default text.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::user::Identity;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AuthError {
  #[error("email already in use")]
  EmailAlreadyInUse,

  #[error("invalid email address")]
  InvalidEmail,

  #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
  WeakPassword,

  #[error("user not found")]
  UserNotFound,

  #[error("wrong password")]
  WrongPassword,

  #[error("invalid phone number")]
  InvalidPhoneNumber,

  #[error("invalid or expired verification code")]
  InvalidVerificationCode,

  #[error("invalid or expired password reset token")]
  InvalidActionCode,

  /// The supplied credentials belong to a different user.
  #[error("credentials do not match the target user")]
  UserMismatch,

  /// A federated profile with an unverified email named an existing account.
  #[error("an account already exists with this email")]
  AccountExistsWithDifferentCredential,

  #[error("identity backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AuthError {
  pub fn backend<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Backend(Box::new(e))
  }

  /// Stable machine-readable code.
  pub fn code(&self) -> &'static str {
    match self {
      Self::EmailAlreadyInUse => "auth/email-already-in-use",
      Self::InvalidEmail => "auth/invalid-email",
      Self::WeakPassword => "auth/weak-password",
      Self::UserNotFound => "auth/user-not-found",
      Self::WrongPassword => "auth/wrong-password",
      Self::InvalidPhoneNumber => "auth/invalid-phone-number",
      Self::InvalidVerificationCode => "auth/invalid-verification-code",
      Self::InvalidActionCode => "auth/invalid-action-code",
      Self::UserMismatch => "auth/user-mismatch",
      Self::AccountExistsWithDifferentCredential => {
        "auth/account-exists-with-different-credential"
      }
      Self::Backend(_) => "auth/internal-error",
    }
  }

  /// Text suitable for a toast or alert.
  pub fn user_message(&self) -> &'static str {
    match self {
      Self::EmailAlreadyInUse => {
        "Email already in use. Please use another email or login."
      }
      Self::InvalidEmail => "Invalid email address. Please check your email.",
      Self::WeakPassword => "Password must be at least 6 characters long.",
      Self::UserNotFound => "User not found. Please check your email.",
      Self::WrongPassword => "Incorrect password. Please try again.",
      Self::InvalidPhoneNumber => "Invalid phone number.",
      Self::InvalidVerificationCode => {
        "Invalid verification code. Please try again."
      }
      Self::InvalidActionCode => {
        "This reset link is invalid or has expired. Please request a new one."
      }
      Self::UserMismatch => "These credentials belong to a different account.",
      Self::AccountExistsWithDifferentCredential => {
        "An account already exists with this email. Sign in with your password instead."
      }
      Self::Backend(_) => "Something went wrong. Please try again.",
    }
  }
}

/// Loose structural check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
  let (local, domain) = email.split_once('@').ok_or(AuthError::InvalidEmail)?;
  let well_formed = !local.is_empty()
    && !domain.contains('@')
    && domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
    && !email.chars().any(char::is_whitespace);
  if well_formed { Ok(()) } else { Err(AuthError::InvalidEmail) }
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    Err(AuthError::WeakPassword)
  } else {
    Ok(())
  }
}

/// E.164: a leading `+` followed by 8–15 digits.
pub fn validate_phone_number(phone: &str) -> Result<(), AuthError> {
  let digits = phone.strip_prefix('+').ok_or(AuthError::InvalidPhoneNumber)?;
  if (8..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
  {
    Ok(())
  } else {
    Err(AuthError::InvalidPhoneNumber)
  }
}

/// The profile returned by a completed federated (e.g. Google) popup flow.
///
/// The token exchange happens upstream; the provider trusts `subject` as
/// verified. `email` is only used to join an existing account when
/// `email_verified` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedProfile {
  /// e.g. `google.com`
  pub provider:       String,
  /// The provider's stable user id.
  pub subject:        String,
  pub email:          Option<String>,
  #[serde(default)]
  pub email_verified: bool,
  pub display_name:   Option<String>,
}

/// Proof of identity presented again for a sensitive change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Credentials {
  Password { email: String, password: String },
  Federated(FederatedProfile),
}

/// Handle returned when a phone verification challenge has been issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneConfirmation {
  pub verification_id: Uuid,
  pub phone_number:    String,
}

/// How a one-time code reaches its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Delivery {
  /// Phone sign-in code.
  Sms,
  /// Password-reset token.
  Email,
}

/// Delivers one-time codes (SMS gateway and mailer seam).
pub trait CodeSender: Send + Sync {
  fn send_code(
    &self,
    delivery: Delivery,
    destination: &str,
    code: &str,
  ) -> Result<(), AuthError>;
}

/// Abstraction over the identity service.
pub trait IdentityProvider: Send + Sync {
  /// Register an email/password account.
  fn create_account<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
    display_name: Option<&'a str>,
  ) -> impl Future<Output = Result<Identity, AuthError>> + Send + 'a;

  /// Authenticate with email and password.
  fn verify_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Identity, AuthError>> + Send + 'a;

  /// Find or create the identity linked to a federated profile.
  ///
  /// An unlinked profile joins an existing account with the same email only
  /// when the provider verified that email; otherwise this fails with
  /// [`AuthError::AccountExistsWithDifferentCredential`].
  fn federated_sign_in<'a>(
    &'a self,
    profile: &'a FederatedProfile,
  ) -> impl Future<Output = Result<Identity, AuthError>> + Send + 'a;

  /// The identity already linked to `profile`, without creating one.
  fn find_federated<'a>(
    &'a self,
    profile: &'a FederatedProfile,
  ) -> impl Future<Output = Result<Option<Identity>, AuthError>> + Send + 'a;

  /// Issue a verification code to `phone_number`.
  fn start_phone_sign_in<'a>(
    &'a self,
    phone_number: &'a str,
  ) -> impl Future<Output = Result<PhoneConfirmation, AuthError>> + Send + 'a;

  /// Redeem a code issued by [`Self::start_phone_sign_in`]. Codes are
  /// single-use.
  fn confirm_phone_sign_in<'a>(
    &'a self,
    verification_id: Uuid,
    code: &'a str,
  ) -> impl Future<Output = Result<Identity, AuthError>> + Send + 'a;

  /// Issue a password-reset token to the account registered under `email`.
  fn request_password_reset<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<(), AuthError>> + Send + 'a;

  /// Redeem a reset token and set a new password. Tokens are single-use.
  fn confirm_password_reset<'a>(
    &'a self,
    token: &'a str,
    new_password: &'a str,
  ) -> impl Future<Output = Result<Identity, AuthError>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_shapes() {
    assert!(validate_email("farmer@example.com").is_ok());
    for bad in ["", "no-at-sign", "@example.com", "a@b", "a@.com", "a b@c.com", "a@b@c.com"] {
      assert!(
        matches!(validate_email(bad), Err(AuthError::InvalidEmail)),
        "{bad:?} should be rejected"
      );
    }
  }

  #[test]
  fn short_passwords_are_weak() {
    assert!(matches!(validate_password("12345"), Err(AuthError::WeakPassword)));
    assert!(validate_password("123456").is_ok());
  }

  #[test]
  fn phone_numbers_must_be_e164() {
    assert!(validate_phone_number("+2348012345678").is_ok());
    assert!(validate_phone_number("08012345678").is_err());
    assert!(validate_phone_number("+12").is_err());
    assert!(validate_phone_number("+1800FLOWERS").is_err());
  }

  #[test]
  fn codes_are_stable() {
    assert_eq!(AuthError::UserNotFound.code(), "auth/user-not-found");
    assert_eq!(AuthError::EmailAlreadyInUse.code(), "auth/email-already-in-use");
    assert_eq!(AuthError::UserMismatch.code(), "auth/user-mismatch");
    assert!(AuthError::WrongPassword.user_message().contains("Incorrect"));
  }

  #[test]
  fn credentials_are_tagged_by_method() {
    let password: Credentials = serde_json::from_str(
      r#"{"method":"password","email":"a@b.co","password":"secret1"}"#,
    )
    .unwrap();
    assert!(matches!(password, Credentials::Password { .. }));

    let federated: Credentials = serde_json::from_str(
      r#"{"method":"federated","provider":"google.com","subject":"g-1",
          "email":null,"displayName":null}"#,
    )
    .unwrap();
    match federated {
      Credentials::Federated(p) => assert!(!p.email_verified),
      other => panic!("expected federated credentials, got {other:?}"),
    }
  }
}
