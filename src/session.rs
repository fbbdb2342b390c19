//! Per-run client state.

use crate::credentials::{CredentialStore, Credentials};
use crate::error::Result;
use tracing::{info, warn};

/// Credentials learned or loaded during a run, plus where to persist them.
#[derive(Debug, Default)]
pub struct Session {
    credentials: Option<Credentials>,
    store: Option<CredentialStore>,
}

impl Session {
    /// A session with no credentials and no store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session with credentials already known.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            store: None,
        }
    }

    /// Open a session backed by `store`, loading any saved credentials.
    ///
    /// A corrupt store is an error; a missing one just leaves the session
    /// unregistered.
    pub fn open(store: CredentialStore) -> Result<Self> {
        let credentials = store.load()?;
        if credentials.is_some() {
            info!(path = %store.path().display(), "Loaded stored credentials");
        }
        Ok(Self {
            credentials,
            store: Some(store),
        })
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn is_registered(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn store(&self) -> Option<&CredentialStore> {
        self.store.as_ref()
    }

    /// Adopt new credentials and try to persist them.
    ///
    /// A failed write is logged and otherwise ignored; the credentials stay
    /// usable for this run.
    pub fn update_credentials(&mut self, credentials: Credentials) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&credentials) {
                warn!(
                    path = %store.path().display(),
                    code = e.code(),
                    error = %e,
                    "Failed to persist credentials"
                );
            }
        }
        self.credentials = Some(credentials);
    }
}
