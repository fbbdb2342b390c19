//! Template store for request documents.

use crate::error::{IseeError, Result};
use crate::xml::Element;
use std::path::PathBuf;
use tracing::debug;

const BUNDLED: &[(&str, &str)] = &[
    ("register_soapenv.xml", include_str!("../templates/register_soapenv.xml")),
    ("register_payload.xml", include_str!("../templates/register_payload.xml")),
    ("warranty_soapenv.xml", include_str!("../templates/warranty_soapenv.xml")),
    ("warranty_payload.xml", include_str!("../templates/warranty_payload.xml")),
];

/// Where request templates are read from.
#[derive(Debug, Clone, Default)]
pub enum TemplateStore {
    /// Copies compiled into the binary.
    #[default]
    Bundled,
    /// Files in a directory, looked up by template name.
    Directory(PathBuf),
}

impl TemplateStore {
    /// Bundled templates unless a directory is given.
    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        dir.map_or(Self::Bundled, Self::Directory)
    }

    /// Load and parse a template. Every call returns a fresh tree.
    pub fn load(&self, name: &str) -> Result<Element> {
        let source = self.read(name)?;
        Element::parse(&source).map_err(|e| IseeError::TemplateLoad {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    fn read(&self, name: &str) -> Result<String> {
        match self {
            Self::Bundled => BUNDLED
                .iter()
                .find(|(bundled, _)| *bundled == name)
                .map(|(_, source)| source.to_string())
                .ok_or_else(|| IseeError::TemplateLoad {
                    name: name.to_string(),
                    reason: "no such bundled template".to_string(),
                }),
            Self::Directory(dir) => {
                let path = dir.join(name);
                debug!(path = %path.display(), "Reading template");
                std::fs::read_to_string(&path).map_err(|e| IseeError::TemplateLoad {
                    name: name.to_string(),
                    reason: format!("{}: {}", path.display(), e),
                })
            }
        }
    }
}
