use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::formats::{default_formats, FormatPluginConfig};

/// Configuration of one file system storage plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Filesystem URI (e.g. `file:///`, `s3://bucket`, `memory:///`)
    pub connection: String,
    /// Named workspaces; a `default` workspace is added when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspaces: Option<BTreeMap<String, WorkspaceConfig>>,
    /// Format engines by name; the default format set is used when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<BTreeMap<String, FormatPluginConfig>>,
}

/// A browsable root inside the filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Root path, relative to the connection
    pub location: String,
    /// Whether views may be created in this workspace
    #[serde(default)]
    pub writable: bool,
    /// Format used for files no matcher recognizes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_input_format: Option<String>,
    /// Whether browsing descends into subdirectories
    #[serde(default)]
    pub recursive: bool,
}

impl StorageConfig {
    pub fn new(connection: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            workspaces: None,
            formats: None,
        }
    }

    pub fn with_workspace(mut self, name: impl Into<String>, workspace: WorkspaceConfig) -> Self {
        self.workspaces
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), workspace);
        self
    }

    pub fn with_format(mut self, name: impl Into<String>, format: FormatPluginConfig) -> Self {
        self.formats
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), format);
        self
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Configured formats, or the default set when none are configured
    pub fn formats(&self) -> BTreeMap<String, FormatPluginConfig> {
        self.formats.clone().unwrap_or_else(default_formats)
    }
}

/// The implicit workspace used when none named `default` is configured.
impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            location: "/".to_string(),
            writable: false,
            default_input_format: None,
            recursive: false,
        }
    }
}

impl WorkspaceConfig {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    pub fn with_default_input_format(mut self, format: impl Into<String>) -> Self {
        self.default_input_format = Some(format.into());
        self
    }

    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }
}
