use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::workspace::{WorkspaceSchema, DEFAULT_WORKSPACE};

/// The user a schema tree is being built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    user: String,
}

impl UserSession {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

/// A node of the planner's schema tree.
pub trait Schema: Send + Sync {
    fn name(&self) -> &str;

    fn sub_schema_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn sub_schema(&self, _name: &str) -> Option<Arc<dyn Schema>> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Where a storage plugin attaches its schemas.
pub trait SchemaParent {
    fn add_sub_schema(&mut self, schema: Arc<dyn Schema>);
}

/// Root of a schema tree, keyed by child name.
#[derive(Default)]
pub struct SchemaTree {
    children: BTreeMap<String, Arc<dyn Schema>>,
}

impl SchemaTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.children.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Schema>> {
        self.children.get(name)
    }

    /// Resolve a dotted path such as `dfs.reports`.
    pub fn resolve(&self, path: &str) -> Option<Arc<dyn Schema>> {
        let mut parts = path.split('.');
        let mut schema = self.children.get(parts.next()?)?.clone();
        for part in parts {
            schema = schema.sub_schema(part)?;
        }
        Some(schema)
    }
}

impl SchemaParent for SchemaTree {
    fn add_sub_schema(&mut self, schema: Arc<dyn Schema>) {
        self.children.insert(schema.name().to_string(), schema);
    }
}

impl fmt::Debug for SchemaTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.children.keys()).finish()
    }
}

/// Top-level schema of a file system plugin; each workspace is a sub-schema.
pub struct FileSystemSchema {
    name: String,
    workspaces: BTreeMap<String, Arc<WorkspaceSchema>>,
}

impl FileSystemSchema {
    pub fn new(name: impl Into<String>, workspaces: impl IntoIterator<Item = WorkspaceSchema>) -> Self {
        Self {
            name: name.into(),
            workspaces: workspaces
                .into_iter()
                .map(|workspace| (workspace.name().to_string(), Arc::new(workspace)))
                .collect(),
        }
    }

    pub fn workspace(&self, name: &str) -> Option<&Arc<WorkspaceSchema>> {
        self.workspaces.get(name)
    }

    pub fn default_workspace(&self) -> Option<&Arc<WorkspaceSchema>> {
        self.workspace(DEFAULT_WORKSPACE)
    }
}

impl Schema for FileSystemSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn sub_schema_names(&self) -> Vec<String> {
        self.workspaces.keys().cloned().collect()
    }

    fn sub_schema(&self, name: &str) -> Option<Arc<dyn Schema>> {
        let workspace = self.workspaces.get(name)?.clone();
        Some(workspace)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for FileSystemSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemSchema")
            .field("name", &self.name)
            .field("workspaces", &self.workspaces.keys().collect::<Vec<_>>())
            .finish()
    }
}
