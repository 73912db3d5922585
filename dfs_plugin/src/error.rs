use std::path::PathBuf;

use thiserror::Error;

use crate::formats::FormatReference;

/// Failures while building a [`FileSystemPlugin`](crate::plugin::FileSystemPlugin).
///
/// Construction is all-or-nothing, so any of these leaves no usable plugin behind.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to parse connection '{connection}': {source}")]
    InvalidConnection {
        connection: String,
        source: url::ParseError,
    },

    #[error("unsupported storage scheme '{scheme}' in connection '{connection}'")]
    UnsupportedScheme { scheme: String, connection: String },

    /// `s3://` and `azure://` connections must name a bucket or container.
    #[error("no bucket or container specified in connection '{connection}'")]
    MissingBucket { connection: String },

    #[error("failure setting up file system: {0}")]
    Store(#[from] object_store::Error),

    #[error("invalid storage configuration: {0}")]
    InvalidConfig(String),

    #[error("format plugins '{first}' and '{second}' have identical configurations")]
    DuplicateFormatConfig { first: String, second: String },

    #[error("workspace '{workspace}' names default input format '{format}' which is not registered")]
    UnknownDefaultFormat { workspace: String, format: String },
}

/// Failures while resolving a selection into a physical scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("selection does not describe a format selection: {0}")]
    ConfigDecode(#[source] serde_json::Error),

    #[error("failure getting requested format plugin {0}; it was not one of the format plugins registered")]
    FormatNotRegistered(FormatReference),

    /// Raised by the format engine itself. Kept transparent so the original cause survives.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Failures raised by a format engine while planning a scan.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] object_store::Error),

    #[error("selection contains no files")]
    EmptySelection,

    #[error("selection path '{path}' does not exist")]
    SelectionNotFound { path: String },
}

/// Failures while browsing a workspace or managing its views.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Storage(#[from] object_store::Error),

    #[error("workspace '{workspace}' is not writable")]
    ReadOnly { workspace: String },

    #[error("invalid view name '{name}'")]
    InvalidViewName { name: String },

    #[error("malformed view definition '{name}': {source}")]
    View {
        name: String,
        source: serde_json::Error,
    },
}

/// Failures while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse storage config: {0}")]
    Parse(#[from] serde_json::Error),
}
