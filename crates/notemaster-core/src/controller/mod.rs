//! Session and note list controller.
//!
//! [`NotesController`] owns the token, the confirmed user, the list query,
//! the note list with its selection, the loading/saving flags and the single
//! error slot. User intents arrive as method calls; every remote call is a
//! suspension point, and state is only touched between them under a lock
//! that is never held across an `.await`.
//!
//! List fetches are tagged with a generation number. A response is applied
//! only if no newer fetch was issued (or the session ended) in the meantime,
//! so rapid query changes resolve last-writer-wins without cancelling
//! requests.

mod list;
mod session;
mod state;
mod write;

#[cfg(test)]
mod tests;

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;

use crate::api::{ApiError, NoteService};
use crate::auth::TokenStore;
use crate::models::{DraftError, NoteQuery};

pub use state::{reconcile_selection, ControllerSnapshot, SessionPhase};

use state::ControllerState;

/// Failure taxonomy surfaced by controller operations.
///
/// By the time one of these is returned the controller has already recorded
/// it: fetch and write failures sit in the error slot, rejected tokens have
/// demoted the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The held token was rejected; the session has been cleared.
    #[error("Session is no longer valid; please log in again")]
    AuthRejected,
    /// Login or registration did not succeed.
    #[error("{0}")]
    AuthFailed(String),
    #[error("{0}")]
    FetchFailed(String),
    #[error("{0}")]
    WriteFailed(String),
    #[error(transparent)]
    ValidationFailed(#[from] DraftError),
    #[error("Not logged in")]
    NotAuthenticated,
    /// A newer login or logout replaced the session this call belonged to.
    #[error("Superseded by a newer session change")]
    Superseded,
}

/// Result of a list fetch that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced the note list.
    Applied,
    /// A newer fetch was issued before this one resolved; the response was dropped.
    Superseded,
    /// No confirmed user; the list was cleared without a request.
    SignedOut,
}

/// Proof that the user explicitly confirmed a deletion.
#[derive(Debug)]
pub struct DeleteConfirmation(());

impl DeleteConfirmation {
    /// Only call this after the user has agreed to delete the note.
    #[must_use]
    pub const fn confirmed() -> Self {
        Self(())
    }
}

pub struct NotesController<S: NoteService> {
    service: S,
    store: Box<dyn TokenStore>,
    state: Mutex<ControllerState>,
    publisher: watch::Sender<ControllerSnapshot>,
}

impl<S: NoteService> NotesController<S> {
    pub fn new(service: S, store: impl TokenStore + 'static) -> Self {
        let state = ControllerState::default();
        let (publisher, _) = watch::channel(state.snapshot());
        Self {
            service,
            store: Box::new(store),
            state: Mutex::new(state),
            publisher,
        }
    }

    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Current view of user, notes, selection, flags and error.
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.lock().snapshot()
    }

    /// Receive a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.publisher.subscribe()
    }

    pub fn session_phase(&self) -> SessionPhase {
        self.lock().session.phase()
    }

    pub fn query(&self) -> NoteQuery {
        self.lock().query.clone()
    }

    /// Clear the error slot without retrying anything.
    pub fn dismiss_error(&self) {
        self.update(|state| state.error.clear());
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate state and publish the resulting snapshot.
    fn update<R>(&self, change: impl FnOnce(&mut ControllerState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.lock();
            let result = change(&mut state);
            (result, state.snapshot())
        };
        self.publisher.send_replace(snapshot);
        result
    }
}

/// Human-readable text for the error slot: the service's own message when it
/// sent one, otherwise the operation's fallback with the transport error.
fn failure_message(error: &ApiError, fallback: &str) -> String {
    match error {
        ApiError::Status { message, .. } | ApiError::Unauthorized(message)
            if !message.is_empty() =>
        {
            message.clone()
        }
        ApiError::Status { .. } | ApiError::Unauthorized(_) => fallback.to_string(),
        other => format!("{fallback}: {other}"),
    }
}
