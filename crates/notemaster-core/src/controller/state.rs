//! Controller-owned state and its pure transitions.
//!
//! Nothing in here performs I/O; the async operations in the sibling modules
//! read a ticket out of [`ControllerState`], await the remote call, and hand
//! the response back to one of these transitions.

use crate::auth::Token;
use crate::models::{Note, NoteId, NoteQuery, User};

/// Where a session is in its `bootstrap -> active -> cleared` lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No token held.
    SignedOut,
    /// Token held but not yet confirmed by the profile endpoint.
    Confirming,
    /// Token confirmed; a user is known.
    Active,
}

/// Token and confirmed identity for one logical session.
///
/// A user is only ever present alongside the token it was confirmed with.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<Token>,
    user: Option<User>,
    epoch: u64,
}

impl Session {
    pub fn phase(&self) -> SessionPhase {
        match (&self.token, &self.user) {
            (None, _) => SessionPhase::SignedOut,
            (Some(_), None) => SessionPhase::Confirming,
            (Some(_), Some(_)) => SessionPhase::Active,
        }
    }

    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Token and epoch of a confirmed session.
    pub fn active(&self) -> Option<(Token, u64)> {
        self.user.as_ref()?;
        self.token.clone().map(|token| (token, self.epoch))
    }

    fn begin(&mut self, token: Token) -> u64 {
        self.epoch += 1;
        self.token = Some(token);
        self.user = None;
        self.epoch
    }

    fn confirm(&mut self, epoch: u64, user: User) -> bool {
        if self.epoch != epoch || self.token.is_none() {
            return false;
        }
        self.user = Some(user);
        true
    }

    fn clear(&mut self) {
        self.epoch += 1;
        self.token = None;
        self.user = None;
    }
}

/// Single-slot error message; newer failures overwrite older ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSurface(Option<String>);

impl ErrorSurface {
    pub fn set(&mut self, message: impl Into<String>) {
        self.0 = Some(message.into());
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn message(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Everything a list fetch needs, captured at issue time.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub generation: u64,
    pub epoch: u64,
    pub token: Token,
    pub query: NoteQuery,
}

/// Read-only view of the controller exposed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub user: Option<User>,
    pub notes: Vec<Note>,
    pub selected_id: Option<NoteId>,
    pub loading: bool,
    pub saving: bool,
    pub error: Option<String>,
    pub query: NoteQuery,
}

impl ControllerSnapshot {
    pub fn selected_note(&self) -> Option<&Note> {
        let id = self.selected_id?;
        self.notes.iter().find(|note| note.id == id)
    }

    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Default)]
pub struct ControllerState {
    pub session: Session,
    pub query: NoteQuery,
    pub notes: Vec<Note>,
    pub selected: Option<NoteId>,
    pub loading: bool,
    pub error: ErrorSurface,
    fetch_generation: u64,
    saves_in_flight: usize,
}

impl ControllerState {
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            user: self.session.user().cloned(),
            notes: self.notes.clone(),
            selected_id: self.selected,
            loading: self.loading,
            saving: self.saves_in_flight > 0,
            error: self.error.message().map(ToString::to_string),
            query: self.query.clone(),
        }
    }

    /// Saves may overlap; `saving` stays set until the last one finishes.
    pub fn begin_save(&mut self) {
        self.saves_in_flight += 1;
    }

    pub fn finish_save(&mut self) {
        self.saves_in_flight = self.saves_in_flight.saturating_sub(1);
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.notes.iter().any(|note| note.id == id)
    }

    /// Start a new session with an unconfirmed token. The previous user, if
    /// any, is gone, so the list is cleared as for a sign-out.
    pub fn begin_session(&mut self, token: Token) -> u64 {
        let epoch = self.session.begin(token);
        self.clear_list();
        epoch
    }

    /// Attach a confirmed user if the session has not changed since `epoch`.
    pub fn confirm_session(&mut self, epoch: u64, user: User) -> bool {
        self.session.confirm(epoch, user)
    }

    /// Drop token, user, list and selection.
    pub fn end_session(&mut self) {
        self.session.clear();
        self.clear_list();
    }

    /// Demote the session only if it is still the one that made the call.
    pub fn reject_session(&mut self, epoch: u64) -> bool {
        if self.session.epoch() != epoch {
            return false;
        }
        self.end_session();
        true
    }

    /// Issue a fetch against the current query. Without a confirmed user the
    /// list is emptied synchronously and no ticket is issued.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        let Some((token, epoch)) = self.session.active() else {
            self.clear_list();
            return None;
        };
        self.fetch_generation += 1;
        self.loading = true;
        Some(FetchTicket {
            generation: self.fetch_generation,
            epoch,
            token,
            query: self.query.clone(),
        })
    }

    /// Replace the list with a fetch result unless a newer fetch was issued.
    pub fn apply_fetch(&mut self, generation: u64, notes: Vec<Note>) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.notes = notes;
        self.selected = reconcile_selection(&self.notes, self.selected);
        self.loading = false;
        self.error.clear();
        true
    }

    /// Record a failed fetch; the previous list and selection stay in place.
    pub fn fail_fetch(&mut self, generation: u64, message: String) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.loading = false;
        self.error.set(message);
        true
    }

    /// Drop a note the server confirmed as deleted and fall back to another.
    pub fn remove_note(&mut self, epoch: u64, id: NoteId) -> bool {
        if self.session.epoch() != epoch {
            return false;
        }
        self.notes.retain(|note| note.id != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.selected = reconcile_selection(&self.notes, self.selected);
        self.error.clear();
        true
    }

    const fn is_current(&self, generation: u64) -> bool {
        generation == self.fetch_generation
    }

    fn clear_list(&mut self) {
        // Any fetch still in flight belongs to a session that no longer exists.
        self.fetch_generation += 1;
        self.notes.clear();
        self.selected = None;
        self.loading = false;
    }
}

/// Keep the selection if the new list still contains it, otherwise fall back
/// to the server's top-ranked note, or to nothing for an empty list.
pub fn reconcile_selection(notes: &[Note], selected: Option<NoteId>) -> Option<NoteId> {
    let first = notes.first()?;
    match selected {
        Some(id) if notes.iter().any(|note| note.id == id) => Some(id),
        _ => Some(first.id),
    }
}
