//! Query changes and the single list fetch path.

use super::{failure_message, ControllerError, FetchOutcome, NotesController};
use crate::api::NoteService;
use crate::models::{NoteId, SortKey};

impl<S: NoteService> NotesController<S> {
    /// Fetch the note list for the current query and reconcile the selection.
    ///
    /// The query and token are read when the request is issued. If another
    /// fetch is issued (or the session ends) before this one resolves, the
    /// response is dropped and [`FetchOutcome::Superseded`] is returned.
    pub async fn refresh(&self) -> Result<FetchOutcome, ControllerError> {
        let Some(ticket) = self.update(|state| state.begin_fetch()) else {
            return Ok(FetchOutcome::SignedOut);
        };
        tracing::debug!(
            generation = ticket.generation,
            search = %ticket.query.search_term,
            sort = %ticket.query.sort_key,
            "Fetching notes"
        );

        match self.service.list_notes(&ticket.token, &ticket.query).await {
            Ok(notes) => {
                let count = notes.len();
                if self.update(|state| state.apply_fetch(ticket.generation, notes)) {
                    tracing::debug!(generation = ticket.generation, count, "Applied note list");
                    Ok(FetchOutcome::Applied)
                } else {
                    tracing::debug!(generation = ticket.generation, "Dropped stale note list");
                    Ok(FetchOutcome::Superseded)
                }
            }
            Err(error) if error.is_unauthorized() => {
                self.reject_session(ticket.epoch);
                Err(ControllerError::AuthRejected)
            }
            Err(error) => {
                let message = failure_message(&error, "Could not load notes");
                if self.update(|state| state.fail_fetch(ticket.generation, message.clone())) {
                    tracing::warn!("Note fetch failed: {}", message);
                    Err(ControllerError::FetchFailed(message))
                } else {
                    tracing::debug!(generation = ticket.generation, "Dropped stale fetch error");
                    Ok(FetchOutcome::Superseded)
                }
            }
        }
    }

    /// Replace the search term and re-fetch, even if the term is unchanged.
    pub async fn set_search_term(
        &self,
        term: impl Into<String>,
    ) -> Result<FetchOutcome, ControllerError> {
        let term = term.into();
        self.update(|state| state.query.search_term = term);
        self.refresh().await
    }

    /// Replace the sort key and re-fetch, even if the key is unchanged.
    pub async fn set_sort_key(&self, sort_key: SortKey) -> Result<FetchOutcome, ControllerError> {
        self.update(|state| state.query.sort_key = sort_key);
        self.refresh().await
    }

    /// Limit the number of notes requested per fetch. Takes effect on the next fetch.
    pub fn set_limit(&self, limit: Option<u32>) {
        self.update(|state| state.query.limit = limit);
    }

    /// Select a note from the current list. Ids not in the list are ignored.
    pub fn select(&self, id: NoteId) -> bool {
        self.update(|state| {
            if state.contains(id) {
                state.selected = Some(id);
                true
            } else {
                false
            }
        })
    }
}
