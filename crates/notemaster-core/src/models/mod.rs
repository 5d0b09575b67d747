//! Data models for NoteMaster

mod note;
mod query;
mod user;

pub use note::{DraftError, Note, NoteDraft, NoteId, MAX_TITLE_CHARS};
pub use query::{NoteQuery, ParseSortKeyError, SortKey};
pub use user::{RegisteredUser, User};
