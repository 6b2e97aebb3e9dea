//! Session store backed by a JSON file in the user's config directory

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Credentials, Session, SessionStore};
use crate::error::{ClientError, ClientResult};

#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    // serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> ClientResult<Session> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Session::default()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ClientError::Session(format!("Corrupt session file {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Session::default()),
            Err(e) => Err(ClientError::Session(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, session: &Session) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::Session(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        let bytes = serde_json::to_vec_pretty(session)
            .map_err(|e| ClientError::Session(format!("Failed to encode session: {}", e)))?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&self.path)
            .await
            .map_err(|e| ClientError::Session(format!("Failed to open {}: {}", self.path.display(), e)))?;

        use tokio::io::AsyncWriteExt;
        file.write_all(&bytes)
            .await
            .map_err(|e| ClientError::Session(format!("Failed to write {}: {}", self.path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| ClientError::Session(format!("Failed to write {}: {}", self.path.display(), e)))?;

        tracing::debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    async fn update(&self, f: impl FnOnce(&mut Session) + Send) -> ClientResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut session = self.load().await?;
        f(&mut session);
        self.save(&session).await
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self) -> ClientResult<Option<String>> {
        Ok(self.load().await?.token().map(str::to_string))
    }

    async fn set(&self, token: &str, username: &str, password: &str) -> ClientResult<()> {
        let session = Session {
            token: Some(token.to_string()),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        };
        self.update(|s| *s = session).await
    }

    async fn set_token(&self, token: &str) -> ClientResult<()> {
        let token = token.to_string();
        self.update(|s| s.token = Some(token)).await
    }

    async fn credentials(&self) -> ClientResult<Option<Credentials>> {
        Ok(self.load().await?.credentials())
    }

    async fn discard_token(&self) -> ClientResult<()> {
        self.update(|s| s.token = Some(String::new())).await
    }

    async fn clear(&self) -> ClientResult<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Session(format!(
                "Failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
