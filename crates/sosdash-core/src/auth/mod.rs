//! Session credentials.
//!
//! The core never logs in by itself; it only reads the token a previous
//! login stored and treats its absence as "not authenticated".

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the stored token
pub const TOKEN_ENV_VAR: &str = "SOSDASH_TOKEN";

/// Opaque credential sent with every API request
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Source of the session token
pub trait CredentialStore: Send + Sync {
    /// Current token, if signed in
    fn token(&self) -> Option<SessionToken>;

    /// Persist a token returned by the login endpoint
    fn save(&self, token: &SessionToken, user_id: Option<&str>) -> Result<()>;

    /// Forget the stored token
    fn clear(&self) -> Result<()>;
}

/// On-disk credentials format
#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    token: String,
    #[serde(default)]
    user_id: Option<String>,
}

/// Credentials kept in a JSON file, with an environment override
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `path`, or at the default location when `None`
    pub fn from_override(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::new(p),
            None => Self::new(Self::default_path()),
        }
    }

    /// `<config dir>/sosdash/credentials.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sosdash/credentials.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_stored(&self) -> Option<StoredCredentials> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(path = ?self.path, "No stored credentials: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(stored) => Some(stored),
            Err(e) => {
                tracing::warn!(path = ?self.path, "Ignoring unreadable credentials file: {}", e);
                None
            }
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn token(&self) -> Option<SessionToken> {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.trim().is_empty() {
                return Some(SessionToken::new(token.trim()));
            }
        }
        self.read_stored()
            .filter(|s| !s.token.is_empty())
            .map(|s| SessionToken::new(s.token))
    }

    fn save(&self, token: &SessionToken, user_id: Option<&str>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let stored = StoredCredentials {
            token: token.as_str().to_string(),
            user_id: user_id.map(str::to_string),
        };
        let content = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write credentials: {:?}", self.path))?;
        tracing::info!(path = ?self.path, "Saved session token");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove credentials: {:?}", self.path))
            }
        }
    }
}

/// In-memory credentials (tests and embedding)
#[derive(Default)]
pub struct StaticCredentials {
    token: RwLock<Option<SessionToken>>,
}

impl StaticCredentials {
    pub fn new(token: Option<SessionToken>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(Some(SessionToken::new(token)))
    }
}

impl CredentialStore for StaticCredentials {
    fn token(&self) -> Option<SessionToken> {
        self.token.read().clone()
    }

    fn save(&self, token: &SessionToken, _user_id: Option<&str>) -> Result<()> {
        *self.token.write() = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.write() = None;
        Ok(())
    }
}
