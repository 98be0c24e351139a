//! [`IdentityProvider`] over the same SQLite file as the document store.
//!
//! Passwords are stored as argon2 PHC strings. Phone codes are six digits,
//! valid for [`PHONE_CODE_TTL_MINUTES`], single-use, and stored hashed.
//! Password-reset tokens follow the same rules with
//! [`RESET_TOKEN_TTL_MINUTES`].

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore};
use rusqlite::OptionalExtension as _;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use uniagric_core::{
  identity::{
    AuthError, CodeSender, Delivery, FederatedProfile, IdentityProvider,
    PhoneConfirmation, validate_email, validate_password, validate_phone_number,
  },
  user::Identity,
};

use crate::{
  SqliteStore,
  encode::{RawIdentity, encode_dt, encode_uuid},
  error::Error,
};

pub const PHONE_CODE_TTL_MINUTES: i64 = 10;
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

const IDENTITY_COLUMNS: &str = "uid, email, display_name, phone_number";

/// Default [`CodeSender`]: writes the code to the log instead of an SMS
/// gateway or mailer. Suitable for development only.
pub struct LogCodeSender;

impl CodeSender for LogCodeSender {
  fn send_code(
    &self,
    delivery: Delivery,
    destination: &str,
    code: &str,
  ) -> Result<(), AuthError> {
    tracing::info!(%delivery, %destination, %code, "one-time code issued");
    Ok(())
  }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| AuthError::backend(Error::PasswordHash(e.to_string())))
}

fn hash_code(code: &str) -> String { hex::encode(Sha256::digest(code.as_bytes())) }

fn reset_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

fn backend(e: impl Into<Error>) -> AuthError { AuthError::backend(e.into()) }

/// Outcome of the account-creation transaction.
enum Created {
  Identity(RawIdentity),
  EmailTaken,
}

/// Outcome of redeeming a phone code or reset token.
enum Redeemed {
  Identity(RawIdentity),
  Rejected,
}

/// Outcome of the federated find-or-create transaction.
enum Federated {
  Identity(RawIdentity),
  EmailTaken,
}

impl IdentityProvider for SqliteStore {
  async fn create_account(
    &self,
    email: &str,
    password: &str,
    display_name: Option<&str>,
  ) -> Result<Identity, AuthError> {
    validate_email(email)?;
    validate_password(password)?;

    let password_hash = hash_password(password)?;
    let uid_str       = encode_uuid(Uuid::new_v4());
    let email_str     = email.to_owned();
    let name_str      = display_name.map(str::to_owned);
    let at_str        = encode_dt(Utc::now());

    let created = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM identities WHERE email = ?1",
            rusqlite::params![email_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(Created::EmailTaken);
        }

        tx.execute(
          "INSERT INTO identities (uid, email, password_hash, display_name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![uid_str, email_str, password_hash, name_str, at_str],
        )?;
        tx.commit()?;

        Ok(Created::Identity(RawIdentity {
          uid:          uid_str,
          email:        Some(email_str),
          display_name: name_str,
          phone_number: None,
        }))
      })
      .await
      .map_err(backend)?;

    match created {
      Created::EmailTaken => Err(AuthError::EmailAlreadyInUse),
      Created::Identity(raw) => raw.into_identity().map_err(backend),
    }
  }

  async fn verify_password(
    &self,
    email: &str,
    password: &str,
  ) -> Result<Identity, AuthError> {
    validate_email(email)?;
    let email_str = email.to_owned();

    let row: Option<(RawIdentity, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {IDENTITY_COLUMNS}, password_hash FROM identities WHERE email = ?1"
            ),
            rusqlite::params![email_str],
            |row| Ok((RawIdentity::from_row(row)?, row.get(4)?)),
          )
          .optional()?)
      })
      .await
      .map_err(backend)?;

    let (raw, stored_hash) = row.ok_or(AuthError::UserNotFound)?;
    // Accounts created through a federated provider or phone have no
    // password to match.
    let stored_hash = stored_hash.ok_or(AuthError::WrongPassword)?;

    let parsed = PasswordHash::new(&stored_hash)
      .map_err(|e| backend(Error::PasswordHash(e.to_string())))?;
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .map_err(|_| AuthError::WrongPassword)?;

    raw.into_identity().map_err(backend)
  }

  async fn federated_sign_in(
    &self,
    profile: &FederatedProfile,
  ) -> Result<Identity, AuthError> {
    let provider = profile.provider.clone();
    let subject  = profile.subject.clone();
    let email    = profile.email.clone();
    let verified = profile.email_verified;
    let name     = profile.display_name.clone();
    let at_str   = encode_dt(Utc::now());
    let new_uid  = encode_uuid(Uuid::new_v4());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let select = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE uid = ?1");
        let linked: Option<String> = tx
          .query_row(
            "SELECT uid FROM federated_links WHERE provider = ?1 AND subject = ?2",
            rusqlite::params![provider, subject],
            |r| r.get(0),
          )
          .optional()?;
        if let Some(uid) = linked {
          let raw = tx.query_row(&select, rusqlite::params![uid], RawIdentity::from_row)?;
          return Ok(Federated::Identity(raw));
        }

        // One identity per email. Joining an existing account needs a
        // provider-verified address.
        let by_email: Option<RawIdentity> = match &email {
          Some(e) => tx
            .query_row(
              &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE email = ?1"),
              rusqlite::params![e],
              RawIdentity::from_row,
            )
            .optional()?,
          None => None,
        };

        let raw = match by_email {
          Some(_) if !verified => return Ok(Federated::EmailTaken),
          Some(raw) => raw,
          None => {
            tx.execute(
              "INSERT INTO identities (uid, email, display_name, created_at)
               VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![new_uid, email, name, at_str],
            )?;
            RawIdentity {
              uid:          new_uid,
              email,
              display_name: name,
              phone_number: None,
            }
          }
        };

        tx.execute(
          "INSERT INTO federated_links (provider, subject, uid) VALUES (?1, ?2, ?3)",
          rusqlite::params![provider, subject, raw.uid],
        )?;
        tx.commit()?;
        Ok(Federated::Identity(raw))
      })
      .await
      .map_err(backend)?;

    match outcome {
      Federated::EmailTaken => {
        tracing::warn!(
          provider = %profile.provider,
          "unverified federated email matches an existing account; not linked"
        );
        Err(AuthError::AccountExistsWithDifferentCredential)
      }
      Federated::Identity(raw) => raw.into_identity().map_err(backend),
    }
  }

  async fn find_federated(
    &self,
    profile: &FederatedProfile,
  ) -> Result<Option<Identity>, AuthError> {
    let provider = profile.provider.clone();
    let subject  = profile.subject.clone();

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT i.uid, i.email, i.display_name, i.phone_number
             FROM federated_links l JOIN identities i ON i.uid = l.uid
             WHERE l.provider = ?1 AND l.subject = ?2",
            rusqlite::params![provider, subject],
            RawIdentity::from_row,
          )
          .optional()?)
      })
      .await
      .map_err(backend)?;

    raw.map(RawIdentity::into_identity).transpose().map_err(backend)
  }

  async fn start_phone_sign_in(
    &self,
    phone_number: &str,
  ) -> Result<PhoneConfirmation, AuthError> {
    validate_phone_number(phone_number)?;

    let code = format!("{:06}", OsRng.next_u32() % 1_000_000);
    let confirmation = PhoneConfirmation {
      verification_id: Uuid::new_v4(),
      phone_number:    phone_number.to_owned(),
    };

    let id_str    = encode_uuid(confirmation.verification_id);
    let phone_str = confirmation.phone_number.clone();
    let code_hash = hash_code(&code);
    let at_str    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO phone_challenges (verification_id, phone_number, code_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, phone_str, code_hash, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(backend)?;

    self.codes.send_code(Delivery::Sms, phone_number, &code)?;
    Ok(confirmation)
  }

  async fn confirm_phone_sign_in(
    &self,
    verification_id: Uuid,
    code: &str,
  ) -> Result<Identity, AuthError> {
    let id_str    = encode_uuid(verification_id);
    let code_hash = hash_code(code.trim());
    let now       = Utc::now();
    let oldest    = encode_dt(now - Duration::minutes(PHONE_CODE_TTL_MINUTES));
    let at_str    = encode_dt(now);
    let new_uid   = encode_uuid(Uuid::new_v4());

    let redeemed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let challenge: Option<(String, String, String)> = tx
          .query_row(
            "SELECT phone_number, code_hash, created_at FROM phone_challenges
             WHERE verification_id = ?1 AND consumed = 0",
            rusqlite::params![id_str],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;
        let Some((phone, stored_hash, created_at)) = challenge else {
          return Ok(Redeemed::Rejected);
        };
        if stored_hash != code_hash || created_at < oldest {
          return Ok(Redeemed::Rejected);
        }

        tx.execute(
          "UPDATE phone_challenges SET consumed = 1 WHERE verification_id = ?1",
          rusqlite::params![id_str],
        )?;

        let existing: Option<RawIdentity> = tx
          .query_row(
            &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE phone_number = ?1"),
            rusqlite::params![phone],
            RawIdentity::from_row,
          )
          .optional()?;

        let raw = match existing {
          Some(raw) => raw,
          None => {
            tx.execute(
              "INSERT INTO identities (uid, phone_number, created_at) VALUES (?1, ?2, ?3)",
              rusqlite::params![new_uid, phone, at_str],
            )?;
            RawIdentity {
              uid:          new_uid,
              email:        None,
              display_name: None,
              phone_number: Some(phone),
            }
          }
        };

        tx.commit()?;
        Ok(Redeemed::Identity(raw))
      })
      .await
      .map_err(backend)?;

    match redeemed {
      Redeemed::Rejected => Err(AuthError::InvalidVerificationCode),
      Redeemed::Identity(raw) => raw.into_identity().map_err(backend),
    }
  }

  async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
    validate_email(email)?;

    let token     = reset_token();
    let token_h   = hash_code(&token);
    let email_str = email.to_owned();
    let at_str    = encode_dt(Utc::now());

    // `None` when no account has this email; `Some(None)` when the account
    // has no password to reset.
    let found: Option<Option<String>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let row: Option<(String, Option<String>)> = tx
          .query_row(
            "SELECT uid, password_hash FROM identities WHERE email = ?1",
            rusqlite::params![email_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let Some((uid, password_hash)) = row else {
          return Ok(None);
        };
        if password_hash.is_none() {
          return Ok(Some(None));
        }

        tx.execute(
          "INSERT INTO password_resets (token_hash, uid, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![token_h, uid, at_str],
        )?;
        tx.commit()?;
        Ok(Some(Some(uid)))
      })
      .await
      .map_err(backend)?;

    match found {
      None => Err(AuthError::UserNotFound),
      Some(None) => {
        tracing::info!("password reset requested for an account without a password");
        Ok(())
      }
      Some(Some(uid)) => {
        tracing::info!(%uid, "password reset requested");
        self.codes.send_code(Delivery::Email, email, &token)
      }
    }
  }

  async fn confirm_password_reset(
    &self,
    token: &str,
    new_password: &str,
  ) -> Result<Identity, AuthError> {
    validate_password(new_password)?;

    let password_hash = hash_password(new_password)?;
    let token_h       = hash_code(token.trim());
    let oldest        = encode_dt(Utc::now() - Duration::minutes(RESET_TOKEN_TTL_MINUTES));

    let redeemed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let pending: Option<(String, String)> = tx
          .query_row(
            "SELECT uid, created_at FROM password_resets
             WHERE token_hash = ?1 AND consumed = 0",
            rusqlite::params![token_h],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let Some((uid, created_at)) = pending else {
          return Ok(Redeemed::Rejected);
        };
        if created_at < oldest {
          return Ok(Redeemed::Rejected);
        }

        tx.execute(
          "UPDATE password_resets SET consumed = 1 WHERE token_hash = ?1",
          rusqlite::params![token_h],
        )?;
        tx.execute(
          "UPDATE identities SET password_hash = ?2 WHERE uid = ?1",
          rusqlite::params![uid, password_hash],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE uid = ?1"),
          rusqlite::params![uid],
          RawIdentity::from_row,
        )?;
        tx.commit()?;
        Ok(Redeemed::Identity(raw))
      })
      .await
      .map_err(backend)?;

    match redeemed {
      Redeemed::Rejected => Err(AuthError::InvalidActionCode),
      Redeemed::Identity(raw) => raw.into_identity().map_err(backend),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn code_hash_is_hex_sha256() {
    let h = hash_code("123456");
    assert_eq!(h.len(), 64);
    assert_ne!(h, hash_code("123457"));
  }

  #[test]
  fn reset_tokens_are_unique_hex() {
    let (a, b) = (reset_token(), reset_token());
    assert_eq!(a.len(), 64);
    assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
  }

  #[test]
  fn password_hash_verifies() {
    let phc = hash_password("hunter22").unwrap();
    let parsed = PasswordHash::new(&phc).unwrap();
    assert!(Argon2::default().verify_password(b"hunter22", &parsed).is_ok());
    assert!(Argon2::default().verify_password(b"hunter23", &parsed).is_err());
  }
}
