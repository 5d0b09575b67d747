//! Token acquisition, confirmation, and demotion.

use super::{ControllerError, NotesController};
use crate::api::{ApiError, NoteService};
use crate::auth::{Credentials, Registration, Token};
use crate::models::User;

impl<S: NoteService> NotesController<S> {
    /// Resolve a previously persisted token to a user.
    ///
    /// A missing token leaves the controller signed out without any remote
    /// call. A token the service refuses, for whatever reason, is discarded
    /// for good; that is not an error the user needs to see, so it never
    /// reaches the error slot.
    pub async fn bootstrap(&self) -> Option<User> {
        let stored = self.store.load().unwrap_or_else(|error| {
            tracing::warn!("Failed to read stored token: {}", error);
            None
        });
        let Some(token) = stored else {
            tracing::debug!("No stored token; starting signed out");
            return None;
        };

        let epoch = self.update(|state| state.begin_session(token.clone()));
        self.confirm(epoch, token).await.ok()
    }

    /// Log in, persist the token, and confirm it through the profile endpoint.
    ///
    /// Failures are returned to the caller (the auth form) rather than written
    /// to the controller's error slot.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ControllerError> {
        credentials
            .validate()
            .map_err(|error| ControllerError::AuthFailed(error.to_string()))?;
        let token = self
            .service
            .login(credentials)
            .await
            .map_err(auth_failed)?;
        self.establish(token).await
    }

    /// Register an account, then log in with the same credentials.
    pub async fn register(&self, registration: &Registration) -> Result<User, ControllerError> {
        registration
            .validate()
            .map_err(|error| ControllerError::AuthFailed(error.to_string()))?;
        let token = self
            .service
            .register_and_login(registration)
            .await
            .map_err(auth_failed)?;
        self.establish(token).await
    }

    /// Forget the token, user, list and selection. No remote call is made.
    pub fn logout(&self) {
        if let Err(error) = self.store.clear() {
            tracing::warn!("Failed to clear stored token: {}", error);
        }
        self.update(|state| state.end_session());
        tracing::info!("Signed out");
    }

    async fn establish(&self, token: Token) -> Result<User, ControllerError> {
        if let Err(error) = self.store.save(&token) {
            tracing::warn!("Failed to persist token; session will not survive restart: {}", error);
        }
        let epoch = self.update(|state| {
            state.error.clear();
            state.begin_session(token.clone())
        });
        self.confirm(epoch, token).await.map_err(|error| match error {
            ControllerError::AuthRejected => {
                ControllerError::AuthFailed("Could not confirm the new session".to_string())
            }
            other => other,
        })
    }

    /// Fetch the profile for a freshly held token. Success makes the user
    /// non-null, which triggers the first list fetch. A 401 from that fetch
    /// has already demoted the session, so it is reported as a rejection.
    async fn confirm(&self, epoch: u64, token: Token) -> Result<User, ControllerError> {
        match self.service.profile(&token).await {
            Ok(user) => {
                if !self.update(|state| state.confirm_session(epoch, user.clone())) {
                    tracing::debug!("Discarding profile for a superseded session");
                    return Err(ControllerError::Superseded);
                }
                tracing::info!("Session confirmed for '{}'", user.username);
                match self.refresh().await {
                    Err(ControllerError::AuthRejected) => Err(ControllerError::AuthRejected),
                    Err(error) => {
                        tracing::debug!("Initial note fetch failed: {}", error);
                        Ok(user)
                    }
                    Ok(_) => Ok(user),
                }
            }
            Err(error) => {
                tracing::warn!("Token was rejected by the profile endpoint: {}", error);
                if self.reject_session(epoch) {
                    Err(ControllerError::AuthRejected)
                } else {
                    Err(ControllerError::Superseded)
                }
            }
        }
    }

    /// Demote the session that made a rejected call. Returns false when a
    /// newer login or logout already replaced it.
    pub(super) fn reject_session(&self, epoch: u64) -> bool {
        let rejected = self.update(|state| state.reject_session(epoch));
        if rejected {
            if let Err(error) = self.store.clear() {
                tracing::warn!("Failed to clear rejected token: {}", error);
            }
            tracing::info!("Session demoted after token rejection");
        }
        rejected
    }
}

fn auth_failed(error: ApiError) -> ControllerError {
    ControllerError::AuthFailed(error.to_string())
}
