//! JSON file session store.
//!
//! The file holds one [`SessionRecord`] using the same three field names the
//! browser keeps in `localStorage`. A missing file is an empty session.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::io;
use std::path::{Path, PathBuf};

use session_gate::{Session, SessionRecord, SessionStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot access {path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("cannot parse {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
}

#[derive(Clone, Debug)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] when the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<SessionRecord, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SessionRecord::default()),
            Err(source) => return Err(self.io_error(source)),
        };
        if raw.trim().is_empty() {
            return Ok(SessionRecord::default());
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Parse { path: self.display(), source })
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the file cannot be written.
    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        let rendered = serde_json::to_string_pretty(&session.to_record())
            .map_err(|source| StoreError::Parse { path: self.display(), source })?;
        std::fs::write(&self.path, rendered).map_err(|source| self.io_error(source))
    }

    /// Delete the file. Removing an absent file succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for any failure other than "not found".
    pub fn remove(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io { path: self.display(), source }
    }
}

// The gate treats an unreadable file as an empty session.
impl SessionStore for FileSessionStore {
    fn read(&self) -> SessionRecord {
        self.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, path = %self.path.display(), "session file unreadable; treating as empty");
            SessionRecord::default()
        })
    }

    fn write(&self, session: &Session) {
        if let Err(e) = self.save(session) {
            tracing::warn!(error = %e, path = %self.path.display(), "session file write failed");
        }
    }

    fn clear(&self) {
        if let Err(e) = self.remove() {
            tracing::warn!(error = %e, path = %self.path.display(), "session file clear failed");
        }
    }
}
