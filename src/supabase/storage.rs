//! On-disk session persistence.
//!
//! The file holds one JSON-encoded `Session`. Writes go to a sibling temp
//! file first and are renamed into place, so a crash never leaves half a
//! session behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::auth::{AuthError, Session};

#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted session. A missing file is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the file cannot be read or does not hold a session.
    pub async fn load(&self) -> Result<Option<Session>, AuthError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error(&self.path, &e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| AuthError::Storage(format!("{}: {e}", self.path.display())))
    }

    /// Persist `session`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the file cannot be written.
    pub async fn save(&self, session: &Session) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(parent, &e))?;
        }
        let json = serde_json::to_vec(session).map_err(|e| AuthError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| storage_error(&tmp, &e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_error(&self.path, &e))
    }

    /// Remove the persisted session. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the file exists but cannot be removed.
    pub async fn clear(&self) -> Result<(), AuthError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&self.path, &e)),
        }
    }
}

fn storage_error(path: &Path, err: &std::io::Error) -> AuthError {
    AuthError::Storage(format!("{}: {err}", path.display()))
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
