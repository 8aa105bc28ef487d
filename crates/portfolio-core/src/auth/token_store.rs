use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Token file name inside the per-origin directory
const TOKEN_FILE: &str = "session.json";

/// Keychain service name for the keyring backend
const SERVICE_NAME: &str = "portfolio-client";

/// Durable storage for the single session token of one service origin.
///
/// Only the session store writes through this trait; the API client reads
/// it at request time.
pub trait TokenStore: Send + Sync {
    /// Stored token, if any. Unreadable storage counts as no token.
    fn read(&self) -> Option<String>;

    /// Replace the stored token.
    fn write(&self, token: &str) -> Result<()>;

    /// Remove the stored token. Clearing an empty store succeeds.
    fn clear(&self) -> Result<()>;
}

/// Filesystem-safe key for a service origin (scheme, host, port).
pub fn origin_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or("local");
    let raw = match url.port_or_known_default() {
        Some(port) => format!("{}_{}_{}", url.scheme(), host, port),
        None => format!("{}_{}", url.scheme(), host),
    };
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenFile {
    token: String,
    saved_at: DateTime<Utc>,
}

/// Token kept as JSON in `<data_dir>/<origin>/session.json`.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn for_origin(data_dir: &Path, base_url: &Url) -> Self {
        Self::new(data_dir.join(origin_key(base_url)).join(TOKEN_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl TokenStore for FileTokenStore {
    fn read(&self) -> Option<String> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(error = %e, path = ?self.path, "Failed to read token file");
                return None;
            }
        };
        match serde_json::from_str::<TokenFile>(&contents) {
            Ok(file) if !file.token.trim().is_empty() => {
                debug!(saved_at = %file.saved_at, "Token loaded from disk");
                Some(file.token)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, path = ?self.path, "Ignoring unparseable token file");
                None
            }
        }
    }

    fn write(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create token directory")?;
        }
        let contents = serde_json::to_string_pretty(&TokenFile {
            token: token.to_string(),
            saved_at: Utc::now(),
        })?;

        // Write-then-rename so readers never see a half-written file
        let temp = self.temp_path();
        write_private(&temp, contents.as_bytes()).context("Failed to write token file")?;
        std::fs::rename(&temp, &self.path).context("Failed to replace token file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove token file"),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

/// Token kept in the OS keychain, one entry per service origin.
pub struct KeyringTokenStore {
    account: String,
}

impl KeyringTokenStore {
    pub fn for_origin(base_url: &Url) -> Self {
        Self {
            account: origin_key(base_url),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl TokenStore for KeyringTokenStore {
    fn read(&self) -> Option<String> {
        let entry = match self.entry() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Keyring unavailable");
                return None;
            }
        };
        match entry.get_password() {
            Ok(token) if !token.is_empty() => Some(token),
            Ok(_) | Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read token from keychain");
                None
            }
        }
    }

    fn write(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

/// Process-local store, for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn write(&self, token: &str) -> Result<()> {
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        Ok(())
    }
}
