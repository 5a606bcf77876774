use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::UserRecord;

/// Name of the durable token entry
const TOKEN_FILE: &str = "token";
/// Name of the durable profile entry
const PROFILE_FILE: &str = "profile.json";

/// Session state as held in durable storage: the bearer token plus an
/// optional cached profile with the time it was saved.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSession {
    pub token: String,
    pub profile: Option<PersistedProfile>,
}

/// Cached profile entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedProfile {
    pub saved_at: DateTime<Utc>,
    pub user: UserRecord,
}

/// Durable storage for the session: two entries, written on login, removed
/// on logout, read at startup.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSession>>;
    fn save(&self, session: &PersistedSession) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// File-backed store keeping the token and the serialized profile as two
/// files under a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    fn profile_path(&self) -> PathBuf {
        self.dir.join(PROFILE_FILE)
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Result<Option<PersistedSession>> {
        let token = match std::fs::read_to_string(self.token_path()) {
            Ok(token) => token.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read token entry: {}", self.token_path().display())
                })
            }
        };

        if token.is_empty() {
            return Ok(None);
        }

        // A missing or unreadable profile entry is not fatal; the session
        // manager refreshes the profile from the token.
        let profile = match std::fs::read_to_string(self.profile_path()) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unparseable profile entry");
                    None
                }
            },
            Err(_) => None,
        };

        Ok(Some(PersistedSession { token, profile }))
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        std::fs::write(self.token_path(), &session.token)
            .with_context(|| format!("Failed to write token entry: {}", self.token_path().display()))?;

        match &session.profile {
            Some(profile) => {
                let content =
                    serde_json::to_string_pretty(profile).context("Failed to serialize profile")?;
                std::fs::write(self.profile_path(), content).with_context(|| {
                    format!("Failed to write profile entry: {}", self.profile_path().display())
                })?;
            }
            None => remove_if_exists(&self.profile_path())?,
        }

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        remove_if_exists(&self.token_path())?;
        remove_if_exists(&self.profile_path())?;
        Ok(())
    }
}

fn remove_if_exists(path: &std::path::Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove entry: {}", path.display())),
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    inner: std::sync::Mutex<Option<PersistedSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.inner.lock().unwrap().clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.inner.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock().unwrap() = None;
        Ok(())
    }
}
