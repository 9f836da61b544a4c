//! File-backed identity persistence.
//!
//! The identity is chosen once and reused across runs. It lives in a
//! small JSON record at a configurable path. Read once at startup,
//! written once on selection; failures in either direction are logged
//! and otherwise ignored, so a broken disk never blocks a chat session.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ClientId;

/// On-disk identity record.
#[derive(Debug, Serialize, Deserialize)]
struct IdentityRecord {
    client_id: ClientId,
    saved_at: DateTime<Utc>,
}

/// Loads and saves the persisted identity record.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    /// Creates a store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted identity, if a valid record exists.
    ///
    /// A missing file is normal (first run). An unreadable or invalid
    /// record is logged at `warn` and treated as absent.
    #[must_use]
    pub fn load(&self) -> Option<ClientId> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no persisted identity");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "identity record unreadable");
                return None;
            }
        };
        match serde_json::from_str::<IdentityRecord>(&raw) {
            Ok(record) => {
                tracing::info!(client_id = %record.client_id, "identity loaded");
                Some(record.client_id)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "identity record invalid");
                None
            }
        }
    }

    /// Persists the identity, creating parent directories as needed.
    /// Failures are logged at `warn` and otherwise ignored.
    pub fn save(&self, client_id: &ClientId) {
        let record = IdentityRecord {
            client_id: client_id.clone(),
            saved_at: Utc::now(),
        };
        let json = match serde_json::to_string_pretty(&record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "identity record serialization failed");
                return;
            }
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            tracing::warn!(path = %parent.display(), error = %e, "identity directory creation failed");
            return;
        }
        match std::fs::write(&self.path, json) {
            Ok(()) => tracing::info!(path = %self.path.display(), "identity saved"),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "identity save failed");
            }
        }
    }
}
