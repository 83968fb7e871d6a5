//! Session file: the Row Store persisted between commands.
//!
//! One JSON document, rewritten wholesale after every change and deleted by
//! `reset`. There is no history; the file is the current review state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bitacora_config::Settings;
use bitacora_engine::RowStore;
use thiserror::Error;
use tracing::debug;

use crate::exit_codes::{EXIT_IO, EXIT_NO_SESSION};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session table at {}", .path.display())]
    NoSession { path: PathBuf },
    #[error("cannot read session '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("session file '{}' is corrupt: {source}", .path.display())]
    Corrupt { path: PathBuf, source: serde_json::Error },
    #[error("cannot write session '{}': {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("cannot encode session: {0}")]
    Encode(serde_json::Error),
}

impl SessionError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NoSession { .. } => EXIT_NO_SESSION,
            _ => EXIT_IO,
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NoSession { .. } => Some("run `bitacora extract IMAGE` or `bitacora ingest FILE` first".into()),
            Self::Corrupt { .. } => Some("run `bitacora reset` to start over".into()),
            _ => None,
        }
    }
}

/// Location of the session document.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    /// `--session` / `BITACORA_SESSION`, else `<config dir>/session.json`.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let path = explicit.unwrap_or_else(Settings::default_session_path);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store; a missing file is an empty session.
    pub fn load(&self) -> Result<RowStore, SessionError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RowStore::new()),
            Err(source) => return Err(SessionError::Read { path: self.path.clone(), source }),
        };
        let store: RowStore = serde_json::from_str(&contents)
            .map_err(|source| SessionError::Corrupt { path: self.path.clone(), source })?;

        // Stored deltas are not trusted; they are rebuilt from the readings.
        let store = match store.table() {
            Some(table) => RowStore::from_table(table.clone()),
            None => store,
        };
        debug!(path = %self.path.display(), rows = store.get().len(), "session loaded");
        Ok(store)
    }

    /// Load the store and fail when it holds no table.
    pub fn require(&self) -> Result<RowStore, SessionError> {
        let store = self.load()?;
        if store.is_empty() {
            return Err(SessionError::NoSession { path: self.path.clone() });
        }
        Ok(store)
    }

    /// Write the whole store. An empty store removes the file.
    pub fn save(&self, store: &RowStore) -> Result<(), SessionError> {
        if store.is_empty() {
            self.delete()?;
            return Ok(());
        }
        let json = serde_json::to_string_pretty(store).map_err(SessionError::Encode)?;
        let write_err = |source| SessionError::Write { path: self.path.clone(), source };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        debug!(path = %self.path.display(), rows = store.get().len(), "session saved");
        Ok(())
    }

    /// Remove the file. Returns false when there was nothing to remove.
    pub fn delete(&self) -> Result<bool, SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SessionError::Write { path: self.path.clone(), source }),
        }
    }
}
