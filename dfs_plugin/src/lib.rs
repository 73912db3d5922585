//! File system storage plugin: exposes a local, cloud or in-memory filesystem
//! to a query engine as browsable workspaces of CSV, Parquet and JSON files.

pub mod config;
pub mod error;
pub mod formats;
pub mod plugin;
pub mod registry;
pub mod rules;
pub mod scan;
pub mod schema;
pub mod storage;
pub mod validation;
pub mod workspace;

// Re-export key traits and types
pub use config::{StorageConfig, WorkspaceConfig};
pub use error::{ConfigError, EngineError, ScanError, SetupError, WorkspaceError};
pub use formats::{FormatCreator, FormatMatcher, FormatPlugin, FormatPluginConfig, FormatReference};
pub use plugin::{FileSystemPlugin, PluginContext};
pub use registry::FormatRegistry;
pub use scan::{FileSelection, FormatSelection, PhysicalScan, SchemaPath};
pub use schema::{SchemaParent, SchemaTree, UserSession};
