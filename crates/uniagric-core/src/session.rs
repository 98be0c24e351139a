//! Client session: the "current user" context consumed by pages.
//!
//! State only changes in response to [`SessionEvent`]s, which are queued on
//! one channel and applied by one task, one at a time, in arrival order.
//! Consumers read the state through a [`watch::Receiver`] and must branch on
//! it; there is no implicit "current user" value.

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::{
  accounts::{Accounts, FederatedSignIn},
  identity::{AuthError, FederatedProfile, IdentityProvider},
  store::MarketStore,
  user::{Identity, User, UserType},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
  /// The session task has not processed anything yet.
  #[default]
  Uninitialized,
  /// A notification is being resolved against the user documents.
  Loading,
  Authenticated {
    identity:  Identity,
    /// `None` when the identity has no user document.
    user_type: Option<UserType>,
  },
  Anonymous,
}

impl SessionState {
  pub fn is_settled(&self) -> bool {
    matches!(self, Self::Authenticated { .. } | Self::Anonymous)
  }

  pub fn identity(&self) -> Option<&Identity> {
    match self {
      Self::Authenticated { identity, .. } => Some(identity),
      _ => None,
    }
  }

  pub fn user_type(&self) -> Option<UserType> {
    match self {
      Self::Authenticated { user_type, .. } => *user_type,
      _ => None,
    }
  }
}

/// Session-change notifications, as delivered by the identity service.
#[derive(Debug, Clone)]
pub enum SessionEvent {
  SignedIn(Identity),
  SignedOut,
}

/// An explicit session object driven by a single notification channel.
pub struct Session<I, S> {
  accounts: Accounts<I, S>,
  events:   mpsc::UnboundedSender<SessionEvent>,
  state:    watch::Receiver<SessionState>,
}

impl<I, S> Session<I, S>
where
  I: IdentityProvider + 'static,
  S: MarketStore + 'static,
{
  /// Start the session task. `restored` is the identity recovered from a
  /// previous run, if any; it is delivered as the first notification.
  ///
  /// Must be called from within a tokio runtime.
  pub fn start(accounts: Accounts<I, S>, restored: Option<Identity>) -> Self {
    let (state_tx, state_rx) = watch::channel(SessionState::Uninitialized);
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let initial = match restored {
      Some(identity) => SessionEvent::SignedIn(identity),
      None => SessionEvent::SignedOut,
    };
    // The receiver is alive until the task below is spawned.
    let _ = events_tx.send(initial);

    tokio::spawn(run(accounts.clone(), events_rx, state_tx));

    Self { accounts, events: events_tx, state: state_rx }
  }

  pub fn subscribe(&self) -> watch::Receiver<SessionState> { self.state.clone() }

  /// Snapshot of the current state.
  pub fn current(&self) -> SessionState { self.state.borrow().clone() }

  /// Wait until the state is `Authenticated` or `Anonymous`.
  pub async fn settled(&self) -> SessionState {
    let mut rx = self.state.clone();
    match rx.wait_for(SessionState::is_settled).await {
      Ok(state) => state.clone(),
      // Task gone; report whatever was last published.
      Err(_) => self.state.borrow().clone(),
    }
  }

  fn notify(&self, event: SessionEvent) {
    if self.events.send(event).is_err() {
      tracing::error!("session task has stopped; notification dropped");
    }
  }

  pub async fn sign_up(
    &self,
    email: &str,
    password: &str,
    name: &str,
    user_type: UserType,
  ) -> Result<User, AuthError> {
    let user = self.accounts.sign_up(email, password, name, user_type).await?;
    self.notify(SessionEvent::SignedIn(Identity {
      uid:          user.uid,
      email:        user.email.clone(),
      display_name: user.name.clone(),
      phone_number: None,
    }));
    Ok(user)
  }

  pub async fn sign_in(
    &self,
    email: &str,
    password: &str,
  ) -> Result<Identity, AuthError> {
    let identity = self.accounts.sign_in(email, password).await?;
    self.notify(SessionEvent::SignedIn(identity.clone()));
    Ok(identity)
  }

  pub async fn sign_in_federated(
    &self,
    profile: &FederatedProfile,
    requested: Option<UserType>,
  ) -> Result<FederatedSignIn, AuthError> {
    let outcome = self.accounts.sign_in_federated(profile, requested).await?;
    self.notify(SessionEvent::SignedIn(outcome.identity.clone()));
    Ok(outcome)
  }

  pub async fn confirm_phone_sign_in(
    &self,
    verification_id: Uuid,
    code: &str,
  ) -> Result<Identity, AuthError> {
    let identity =
      self.accounts.confirm_phone_sign_in(verification_id, code).await?;
    self.notify(SessionEvent::SignedIn(identity.clone()));
    Ok(identity)
  }

  /// End the session. Does not touch the document store.
  pub fn sign_out(&self) { self.notify(SessionEvent::SignedOut); }
}

async fn run<I, S>(
  accounts: Accounts<I, S>,
  mut events: mpsc::UnboundedReceiver<SessionEvent>,
  state: watch::Sender<SessionState>,
) where
  I: IdentityProvider,
  S: MarketStore,
{
  while let Some(event) = events.recv().await {
    match event {
      SessionEvent::SignedIn(identity) => {
        state.send_replace(SessionState::Loading);
        let user_type = match accounts.user_type(identity.uid).await {
          Ok(t) => t,
          Err(e) => {
            tracing::warn!(uid = %identity.uid, error = %e, "failed to load user type");
            None
          }
        };
        state.send_replace(SessionState::Authenticated { identity, user_type });
      }
      SessionEvent::SignedOut => {
        state.send_replace(SessionState::Anonymous);
      }
    }
  }
}
