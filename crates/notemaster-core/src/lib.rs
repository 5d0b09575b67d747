//! notemaster-core - Core library for NoteMaster clients
//!
//! This crate contains the note and user models, the remote note service
//! client, the credential store abstraction, and the controller that keeps a
//! session, a query and a server-ordered note list consistent while remote
//! calls are in flight.

pub mod api;
pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod util;

pub use api::{ApiError, HttpNoteService, NoteService};
pub use auth::{Credentials, MemoryTokenStore, Registration, Token, TokenStore};
pub use config::ClientConfig;
pub use controller::{
    ControllerError, ControllerSnapshot, DeleteConfirmation, FetchOutcome, NotesController,
};
pub use error::{Error, Result};
pub use models::{Note, NoteDraft, NoteId, NoteQuery, SortKey, User};
