use std::fmt;

use object_store::path::Path;
use object_store::ObjectMeta;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ScanError};
use crate::formats::{FormatPluginConfig, FormatReference};
use crate::storage::FileSystemHandle;

/// A column reference requested by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaPath(String);

impl SchemaPath {
    pub const STAR: &'static str = "*";

    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// All columns.
    pub fn star() -> Self {
        Self(Self::STAR.to_string())
    }

    pub fn is_star(&self) -> bool {
        self.0 == Self::STAR
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty column list means every column.
    pub fn normalize(columns: &[SchemaPath]) -> Vec<SchemaPath> {
        if columns.is_empty() {
            vec![Self::star()]
        } else {
            columns.to_vec()
        }
    }
}

impl From<&str> for SchemaPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Files, directories or prefixes a scan should read, relative to the filesystem root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSelection {
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_root: Option<String>,
}

impl FileSelection {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            selection_root: None,
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.selection_root = Some(root.into());
        self
    }

    /// Resolve every entry to the concrete files underneath it.
    ///
    /// An entry is either a file or a prefix that is listed recursively.
    pub async fn expand(&self, fs: &FileSystemHandle) -> Result<Vec<ScanFile>, EngineError> {
        if self.files.is_empty() {
            return Err(EngineError::EmptySelection);
        }

        let mut files = Vec::new();
        for entry in &self.files {
            let path = Path::from(entry.as_str());
            if let Some(meta) = fs.status(&path).await? {
                files.push(ScanFile::from(meta));
                continue;
            }

            let listed = fs.list(&path, true).await?;
            if listed.is_empty() {
                return Err(EngineError::SelectionNotFound {
                    path: entry.clone(),
                });
            }
            files.extend(listed.into_iter().map(ScanFile::from));
        }
        Ok(files)
    }
}

/// The planner's request: which format, and which files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSelection {
    pub format: FormatReference,
    pub selection: FileSelection,
}

impl FormatSelection {
    pub fn new(format: impl Into<FormatReference>, selection: FileSelection) -> Self {
        Self {
            format: format.into(),
            selection,
        }
    }

    /// Decode an untyped selection payload.
    pub fn decode(value: &serde_json::Value) -> Result<Self, ScanError> {
        serde_json::from_value(value.clone()).map_err(ScanError::ConfigDecode)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFile {
    pub path: String,
    pub size: usize,
}

impl From<ObjectMeta> for ScanFile {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            path: meta.location.to_string(),
            size: meta.size,
        }
    }
}

/// Executable scan description handed back to the planner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalScan {
    /// Name of the format engine that planned the scan
    pub format: String,
    pub config: FormatPluginConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_root: Option<String>,
    pub files: Vec<ScanFile>,
    pub columns: Vec<SchemaPath>,
}

impl PhysicalScan {
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|file| file.size).sum()
    }
}
