//! Session persistence
//!
//! The session is the only durable client state: a bearer token plus the
//! credentials needed to obtain a new one. Absence of a token means anonymous mode.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::ClientResult, services::book_list::ListMode};

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

/// Stored session record. Field names are the fixed storage keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Session {
    /// Token, ignoring an emptied one
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Credentials {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            _ => None,
        }
    }
}

/// Cached login credentials used to re-authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Storage for the session token and cached credentials.
///
/// No expiry logic lives here; an expired token is discovered by the API client
/// when a request comes back unauthorized.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current token, `None` when anonymous
    async fn get(&self) -> ClientResult<Option<String>>;

    /// Store a fresh login
    async fn set(&self, token: &str, username: &str, password: &str) -> ClientResult<()>;

    /// Replace the token, keeping cached credentials
    async fn set_token(&self, token: &str) -> ClientResult<()>;

    async fn credentials(&self) -> ClientResult<Option<Credentials>>;

    /// Empty the token but keep credentials for re-authentication
    async fn discard_token(&self) -> ClientResult<()>;

    /// Forget everything (logout)
    async fn clear(&self) -> ClientResult<()>;
}

/// Library for signed-in users, public catalog otherwise
pub async fn default_mode(store: &dyn SessionStore) -> ClientResult<ListMode> {
    Ok(match store.get().await? {
        Some(_) => ListMode::PersonalLibrary,
        None => ListMode::Catalog,
    })
}
