//! HTTP implementation of [`NoteService`] backed by `reqwest`.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{ApiError, ApiResult, NoteService};
use crate::auth::{Credentials, Registration, Token};
use crate::config::ClientConfig;
use crate::models::{Note, NoteDraft, NoteId, NoteQuery, RegisteredUser, User};
use crate::util::{compact_text, normalize_base_url};

#[derive(Debug, Clone)]
pub struct HttpNoteService {
    base_url: String,
    client: Client,
}

impl HttpNoteService {
    pub fn new(base_url: impl AsRef<str>) -> ApiResult<Self> {
        let base_url =
            normalize_base_url(base_url.as_ref()).map_err(ApiError::InvalidConfiguration)?;
        Ok(Self {
            base_url,
            client: Client::builder().build()?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        Self::new(&config.api_base_url)
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder, token: &Token) -> RequestBuilder {
        request
            .bearer_auth(token.expose())
            .header(reqwest::header::ACCEPT, "application/json")
    }
}

impl NoteService for HttpNoteService {
    async fn register(&self, registration: &Registration) -> ApiResult<RegisteredUser> {
        let payload = serde_json::json!({
            "username": registration.username,
            "email": registration.email,
            "password": registration.password,
        });
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&payload)
            .send()
            .await?;
        decode_json(ensure_success(response, "Registration failed").await?).await
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<Token> {
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("grant_type", "password"),
        ];
        let response = self
            .client
            .post(self.url("/auth/token"))
            .form(&form)
            .send()
            .await?;
        let payload: TokenResponse =
            decode_json(ensure_success(response, "Login failed").await?).await?;
        payload.into_token()
    }

    async fn profile(&self, token: &Token) -> ApiResult<User> {
        let response = self
            .authorized(self.client.get(self.url("/users/me")), token)
            .send()
            .await?;
        decode_json(ensure_success(response, "Unauthorized").await?).await
    }

    async fn list_notes(&self, token: &Token, query: &NoteQuery) -> ApiResult<Vec<Note>> {
        let response = self
            .authorized(self.client.get(self.url("/notes/")), token)
            .query(&query.query_pairs())
            .send()
            .await?;
        decode_json(ensure_success(response, "Failed to fetch notes").await?).await
    }

    async fn create_note(&self, token: &Token, draft: &NoteDraft) -> ApiResult<Note> {
        let response = self
            .authorized(self.client.post(self.url("/notes/")), token)
            .json(draft)
            .send()
            .await?;
        decode_json(ensure_success(response, "Failed to create note").await?).await
    }

    async fn update_note(&self, token: &Token, id: NoteId, draft: &NoteDraft) -> ApiResult<Note> {
        let response = self
            .authorized(self.client.put(self.url(&format!("/notes/{id}"))), token)
            .json(draft)
            .send()
            .await?;
        decode_json(ensure_success(response, "Failed to update note").await?).await
    }

    async fn delete_note(&self, token: &Token, id: NoteId) -> ApiResult<Option<Note>> {
        let response = self
            .authorized(self.client.delete(self.url(&format!("/notes/{id}"))), token)
            .send()
            .await?;
        let body = ensure_success(response, "Failed to delete note")
            .await?
            .text()
            .await?;
        Ok(parse_optional_note(&body))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> ApiResult<Token> {
        if let Some(token_type) = self.token_type.as_deref() {
            if !token_type.eq_ignore_ascii_case("bearer") {
                tracing::warn!("Unexpected token type '{}' from login", token_type);
            }
        }
        self.access_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .map(Token::new)
            .ok_or_else(|| ApiError::Decode("login response did not include access_token".into()))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

async fn ensure_success(response: Response, fallback: &str) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), body = %compact_text(&body), "Request failed");
    let message = parse_api_error(&body, fallback);
    if status == StatusCode::UNAUTHORIZED {
        Err(ApiError::Unauthorized(message))
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|error| ApiError::Decode(error.to_string()))
}

/// Prefer the service's `detail` field, which is either a message or a list
/// of validation errors; otherwise use the per-operation fallback.
fn parse_api_error(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|payload| payload.detail)
        .and_then(|detail| render_detail(&detail))
        .map_or_else(|| fallback.to_string(), |message| compact_text(&message))
}

fn render_detail(detail: &serde_json::Value) -> Option<String> {
    match detail {
        serde_json::Value::String(message) if !message.trim().is_empty() => {
            Some(message.trim().to_string())
        }
        serde_json::Value::Array(items) => {
            let messages = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .map(str::trim)
                .filter(|message| !message.is_empty())
                .collect::<Vec<_>>();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

fn parse_optional_note(body: &str) -> Option<Note> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(note) => Some(note),
        Err(error) => {
            tracing::debug!("Delete response was not a note: {}", error);
            None
        }
    }
}
