//! Remote note service boundary.
//!
//! [`NoteService`] is the request/response contract the controller depends on;
//! [`HttpNoteService`] implements it against the NoteMaster REST API.

mod http;

use std::future::Future;

use thiserror::Error;

use crate::auth::{Credentials, Registration, Token};
use crate::models::{Note, NoteDraft, NoteId, NoteQuery, RegisteredUser, User};

pub use http::HttpNoteService;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service rejected the presented credentials (HTTP 401).
    #[error("{0} (HTTP 401)")]
    Unauthorized(String),
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Stateless request/response operations offered by the remote service.
///
/// Every method is a suspension point; implementations must not hold any
/// controller state.
pub trait NoteService: Send + Sync {
    /// `POST /auth/register`
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = ApiResult<RegisteredUser>> + Send;

    /// `POST /auth/token` (form encoded, password grant)
    fn login(&self, credentials: &Credentials) -> impl Future<Output = ApiResult<Token>> + Send;

    /// `GET /users/me`
    fn profile(&self, token: &Token) -> impl Future<Output = ApiResult<User>> + Send;

    /// `GET /notes/`, ordered by the server according to `query.sort_key`
    fn list_notes(
        &self,
        token: &Token,
        query: &NoteQuery,
    ) -> impl Future<Output = ApiResult<Vec<Note>>> + Send;

    /// `POST /notes/`
    fn create_note(
        &self,
        token: &Token,
        draft: &NoteDraft,
    ) -> impl Future<Output = ApiResult<Note>> + Send;

    /// `PUT /notes/{id}`
    fn update_note(
        &self,
        token: &Token,
        id: NoteId,
        draft: &NoteDraft,
    ) -> impl Future<Output = ApiResult<Note>> + Send;

    /// `DELETE /notes/{id}`; the service may answer with the removed note or nothing.
    fn delete_note(
        &self,
        token: &Token,
        id: NoteId,
    ) -> impl Future<Output = ApiResult<Option<Note>>> + Send;

    /// Register an account and immediately log in with the same credentials.
    fn register_and_login(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = ApiResult<Token>> + Send
    where
        Self: Sized,
    {
        async move {
            let account = self.register(registration).await?;
            tracing::info!("Registered account '{}'", account.username);
            let credentials = registration.credentials();
            self.login(&credentials).await
        }
    }
}
