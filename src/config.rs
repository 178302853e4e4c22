use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    System,
    Session,
}

impl std::fmt::Display for BusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusKind::System => write!(f, "system"),
            BusKind::Session => write!(f, "session"),
        }
    }
}

/// When a message's attachment list takes the attachment output branch.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentPolicy {
    /// Only a list with at least one entry counts.
    #[default]
    NonEmpty,
    /// Any list counts, including an empty one.
    Present,
}

impl AttachmentPolicy {
    pub fn applies(&self, attachments: Option<&[String]>) -> bool {
        match (self, attachments) {
            (_, None) => false,
            (AttachmentPolicy::NonEmpty, Some(list)) => !list.is_empty(),
            (AttachmentPolicy::Present, Some(_)) => true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbusConfig {
    #[serde(default)]
    pub bus: BusKind,
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default = "default_object_path")]
    pub object_path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub attachments: AttachmentPolicy,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub dbus: DbusConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_service() -> String {
    "org.asamk.Signal".to_string()
}

fn default_object_path() -> String {
    "/org/asamk/Signal".to_string()
}

impl Default for DbusConfig {
    fn default() -> Self {
        Self {
            bus: BusKind::default(),
            service: default_service(),
            object_path: default_object_path(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
