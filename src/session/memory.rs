//! In-process session store

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Credentials, Session, SessionStore};
use crate::error::ClientResult;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }

    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self) -> ClientResult<Option<String>> {
        Ok(self.session.read().await.token().map(str::to_string))
    }

    async fn set(&self, token: &str, username: &str, password: &str) -> ClientResult<()> {
        *self.session.write().await = Session {
            token: Some(token.to_string()),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        };
        Ok(())
    }

    async fn set_token(&self, token: &str) -> ClientResult<()> {
        self.session.write().await.token = Some(token.to_string());
        Ok(())
    }

    async fn credentials(&self) -> ClientResult<Option<Credentials>> {
        Ok(self.session.read().await.credentials())
    }

    async fn discard_token(&self) -> ClientResult<()> {
        self.session.write().await.token = Some(String::new());
        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        *self.session.write().await = Session::default();
        Ok(())
    }
}
