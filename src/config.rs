//! Configuration types for the ISEE client.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the credential file created in the home directory.
pub const DEFAULT_AUTH_FILE_NAME: &str = ".hpiseeauth";

/// Main configuration for the ISEE client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// HTTP transport settings
    pub http: HttpConfig,

    /// Credential store settings
    pub auth: AuthConfig,

    /// Template location
    pub templates: TemplateConfig,
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Scheme and host the operation paths are appended to
    pub host: String,

    /// User-Agent sent with every request
    pub user_agent: String,

    /// Content-Type sent with every request
    pub content_type: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "https://services.isee.hp.com".to_string(),
            user_agent: "RemoteSupport/A.05.05 - gSOAP/2.7".to_string(),
            content_type: "text/xml; charset=utf-8".to_string(),
        }
    }
}

/// Credential store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Credential file path (defaults to `~/.hpiseeauth`)
    pub file: Option<PathBuf>,
}

impl AuthConfig {
    /// Configured credential file, or the default in the home directory.
    pub fn file_path(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(default_auth_file)
    }
}

/// Template location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Load templates from this directory instead of the bundled copies
    pub dir: Option<PathBuf>,
}

/// `~/.hpiseeauth`, falling back to the current directory without a home.
pub fn default_auth_file() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(DEFAULT_AUTH_FILE_NAME)
}
