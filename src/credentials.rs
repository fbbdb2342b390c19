//! Registration credentials and their side-store file.

use crate::error::{IseeError, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Server-issued client identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Global device id
    pub gdid: String,
    /// Registration token
    #[serde(rename = "regtoken")]
    pub registration_token: String,
}

impl Credentials {
    pub fn new(gdid: impl Into<String>, registration_token: impl Into<String>) -> Self {
        Self {
            gdid: gdid.into(),
            registration_token: registration_token.into(),
        }
    }
}

/// JSON file holding `{"gdid": ..., "regtoken": ...}`.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read stored credentials. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<Credentials>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No credential file");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let credentials: Credentials =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;
        if credentials.gdid.is_empty() {
            return Err(self.corrupt("empty gdid"));
        }
        if credentials.registration_token.is_empty() {
            return Err(self.corrupt("empty regtoken"));
        }
        Ok(Some(credentials))
    }

    /// Write credentials, replacing any previous file.
    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(credentials)
            .map_err(|e| IseeError::Io(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "Saved credentials");
        Ok(())
    }

    fn corrupt(&self, reason: impl Into<String>) -> IseeError {
        IseeError::CorruptCredentialStore {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}
