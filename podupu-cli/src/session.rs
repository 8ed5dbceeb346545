//! Persistence of the signed-in session between invocations.
//!
//! The session received from the auth service is written as JSON to an
//! OS-appropriate location and read back by commands that write riddles.

use podupu_core::Session;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::CliResult;

/// Returns the path to the session JSON file.
///
/// - macOS / Linux: `~/.config/podupu/session.json`
/// - Windows: `%APPDATA%/Podupu/session.json`
pub fn session_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("Podupu").join("session.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("podupu").join("session.json")
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::at(session_file_path())
    }
}

impl SessionStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the saved session; `None` if the file is missing or corrupt.
    pub fn load(&self) -> Option<Session> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                log::warn!("Ignoring unreadable session file {}: {e}", self.path.display());
                None
            }
        }
    }

    /// Saves the session, creating parent directories as needed.
    pub fn save(&self, session: &Session) -> CliResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session).map_err(podupu_core::PodupuError::from)?;
        fs::write(&self.path, json)?;
        log::debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    /// Removes the saved session. A missing file is not an error.
    pub fn clear(&self) -> CliResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
