//! Bearer token handling, credential pre-checks, and token persistence.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_USERNAME_CHARS: usize = 3;
const MIN_REGISTRATION_PASSWORD_CHARS: usize = 8;

/// Opaque bearer credential. Presence does not imply validity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Token([REDACTED])")
    }
}

/// Login form values
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> AuthResult<()> {
        validate_username(&self.username)?;
        if self.password.is_empty() {
            return Err(AuthError::InvalidInput("Password is required".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Registration form values
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> AuthResult<()> {
        validate_username(&self.username)?;
        if !email_pattern().is_match(self.email.trim()) {
            return Err(AuthError::InvalidInput(
                "A valid email address is required".to_string(),
            ));
        }
        if self.password.chars().count() < MIN_REGISTRATION_PASSWORD_CHARS {
            return Err(AuthError::InvalidInput(format!(
                "Password must be at least {MIN_REGISTRATION_PASSWORD_CHARS} characters"
            )));
        }
        Ok(())
    }

    /// Credentials used for the automatic login after registration.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
    #[error("Failed to parse stored credential: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Durable storage for the single bearer token held by a session.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> AuthResult<Option<Token>>;
    fn save(&self, token: &Token) -> AuthResult<()>;
    /// Removing an absent token succeeds.
    fn clear(&self) -> AuthResult<()>;
}

/// Process-lifetime token store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<Token>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn with_token(token: Token) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(token))),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<Token> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> AuthResult<Option<Token>> {
        Ok(self.current())
    }

    fn save(&self, token: &Token) -> AuthResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> AuthResult<()> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

fn validate_username(username: &str) -> AuthResult<()> {
    let length = username.trim().chars().count();
    if length == 0 {
        return Err(AuthError::InvalidInput("Username is required".to_string()));
    }
    if length < MIN_USERNAME_CHARS {
        return Err(AuthError::InvalidInput(format!(
            "Username must be at least {MIN_USERNAME_CHARS} characters"
        )));
    }
    Ok(())
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"))
}
