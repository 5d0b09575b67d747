use std::io;

use notemaster_core::controller::ControllerError;
use notemaster_core::models::NoteId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] notemaster_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Invalid note ID '{0}'")]
    InvalidNoteId(String),
    #[error("Note {0} not found in the current list")]
    NoteNotFound(NoteId),
    #[error("Nothing to change; pass --title and/or --content")]
    NothingToEdit,
    #[error("Deletion cancelled")]
    DeleteCancelled,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Not signed in. Run `notemaster auth login --username <name> --password <password>`.")]
    NotSignedIn,
}

impl From<ControllerError> for CliError {
    fn from(error: ControllerError) -> Self {
        Self::Core(error.into())
    }
}
