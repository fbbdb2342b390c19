//! Error types for the ISEE client.

use std::path::PathBuf;
use thiserror::Error;

/// ISEE client errors.
#[derive(Error, Debug)]
pub enum IseeError {
    #[error("Failed to load template {name}: {reason}")]
    TemplateLoad { name: String, reason: String },

    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("XML serialization error: {0}")]
    XmlWrite(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("No registration credentials available")]
    MissingCredentials,

    #[error("Corrupt credential store {}: {reason}", path.display())]
    CorruptCredentialStore { path: PathBuf, reason: String },

    #[error("Invalid entitlement input: {0}")]
    InvalidEntitlementInput(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IseeError {
    /// Short stable code for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TemplateLoad { .. } => "TEMPLATE_LOAD",
            Self::MalformedTemplate(_) => "MALFORMED_TEMPLATE",
            Self::XmlParse(_) => "XML_PARSE",
            Self::XmlWrite(_) => "XML_WRITE",
            Self::Transport(_) => "TRANSPORT",
            Self::Protocol(_) => "PROTOCOL",
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::CorruptCredentialStore { .. } => "CORRUPT_CREDENTIAL_STORE",
            Self::InvalidEntitlementInput(_) => "INVALID_ENTITLEMENT_INPUT",
            Self::UnknownOperation(_) => "UNKNOWN_OPERATION",
            Self::Io(_) => "IO",
        }
    }
}

pub type Result<T> = std::result::Result<T, IseeError>;
