//! Write-then-refetch for saves, write-then-prune for deletes.

use super::state::ControllerState;
use super::{failure_message, ControllerError, DeleteConfirmation, NotesController};
use crate::api::{ApiError, NoteService};
use crate::models::{Note, NoteDraft, NoteId};

impl<S: NoteService> NotesController<S> {
    /// Create (`existing == None`) or update a note, then re-fetch the list
    /// with the current query and select the written note.
    ///
    /// The list is never patched locally: search filtering and ordering are
    /// computed by the server. `saving` is true for the whole call.
    pub async fn save(
        &self,
        existing: Option<&Note>,
        draft: &NoteDraft,
    ) -> Result<Note, ControllerError> {
        let draft = match draft.validate() {
            Ok(draft) => draft,
            Err(error) => {
                self.update(|state| state.error.set(error.to_string()));
                return Err(error.into());
            }
        };
        let Some((token, epoch)) = self.lock().session.active() else {
            return Err(ControllerError::NotAuthenticated);
        };

        self.update(ControllerState::begin_save);
        let result = async {
            let written = match existing {
                Some(note) => self.service.update_note(&token, note.id, &draft).await,
                None => self.service.create_note(&token, &draft).await,
            }
            .map_err(|error| self.write_failed(epoch, &error, "Save failed"))?;
            tracing::info!("Saved note {}", written.id);

            // A refetch dropped as stale leaves the pre-save list in place, so a
            // new note is not selected until the newer fetch lists it.
            self.refresh().await?;
            self.update(|state| {
                if state.session.epoch() == epoch && state.contains(written.id) {
                    state.selected = Some(written.id);
                }
                state.error.clear();
            });
            Ok::<_, ControllerError>(written)
        }
        .await;
        self.update(ControllerState::finish_save);
        result
    }

    /// Delete the selected note on the server, then drop it from the local
    /// list and select another remaining note.
    ///
    /// Returns the deleted id, or `None` when nothing was selected.
    pub async fn delete_selected(
        &self,
        _confirmation: DeleteConfirmation,
    ) -> Result<Option<NoteId>, ControllerError> {
        let (selected, session) = {
            let state = self.lock();
            (state.selected, state.session.active())
        };
        let Some((token, epoch)) = session else {
            return Err(ControllerError::NotAuthenticated);
        };
        let Some(id) = selected else {
            return Ok(None);
        };

        self.service
            .delete_note(&token, id)
            .await
            .map_err(|error| self.write_failed(epoch, &error, "Delete failed"))?;

        if self.update(|state| state.remove_note(epoch, id)) {
            tracing::info!("Deleted note {}", id);
        }
        Ok(Some(id))
    }

    fn write_failed(&self, epoch: u64, error: &ApiError, fallback: &str) -> ControllerError {
        if error.is_unauthorized() {
            self.reject_session(epoch);
            return ControllerError::AuthRejected;
        }
        let message = failure_message(error, fallback);
        tracing::warn!("{}", message);
        self.update(|state| state.error.set(message.clone()));
        ControllerError::WriteFailed(message)
    }
}
