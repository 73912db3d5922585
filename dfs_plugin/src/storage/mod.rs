use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore};
use url::Url;

use crate::error::SetupError;

mod azure;
mod local;
mod s3;

/// Shared handle to the filesystem a plugin reads from.
///
/// Cloning is cheap; every clone refers to the same underlying store.
#[derive(Clone)]
pub struct FileSystemHandle {
    connection: Url,
    store: Arc<dyn ObjectStore>,
}

impl FileSystemHandle {
    pub fn new(connection: Url, store: Arc<dyn ObjectStore>) -> Self {
        Self { connection, store }
    }

    pub fn connection(&self) -> &Url {
        &self.connection
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Metadata for a single file, `None` when nothing exists at `path`.
    pub async fn status(&self, path: &Path) -> object_store::Result<Option<ObjectMeta>> {
        match self.store.head(path).await {
            Ok(meta) => Ok(Some(meta)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Files under `prefix`, ordered by location.
    ///
    /// Without `recursive` only the files directly under `prefix` are returned.
    /// Hidden entries (see [`is_hidden`]) below `prefix` are skipped.
    pub async fn list(&self, prefix: &Path, recursive: bool) -> object_store::Result<Vec<ObjectMeta>> {
        let mut files = if recursive {
            self.store.list(non_root(prefix)).try_collect::<Vec<_>>().await?
        } else {
            self.store.list_with_delimiter(non_root(prefix)).await?.objects
        };
        files.retain(|meta| !is_hidden(prefix, &meta.location));
        files.sort_by(|a, b| a.location.as_ref().cmp(b.location.as_ref()));
        Ok(files)
    }

    /// Directories directly under `prefix`, hidden ones excluded.
    pub async fn list_directories(&self, prefix: &Path) -> object_store::Result<Vec<Path>> {
        let mut dirs = self
            .store
            .list_with_delimiter(non_root(prefix))
            .await?
            .common_prefixes;
        dirs.retain(|dir| !is_hidden(prefix, dir));
        dirs.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
        Ok(dirs)
    }

    /// The first `len` bytes of a file.
    pub async fn read_prefix(&self, path: &Path, len: usize) -> object_store::Result<Bytes> {
        self.store.get_range(path, 0..len).await
    }

    pub async fn get(&self, path: &Path) -> object_store::Result<Bytes> {
        self.store.get(path).await?.bytes().await
    }

    pub async fn put(&self, path: &Path, data: Bytes) -> object_store::Result<()> {
        self.store.put(path, data.into()).await?;
        Ok(())
    }
}

impl fmt::Debug for FileSystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemHandle")
            .field("connection", &self.connection.as_str())
            .field("store", &self.store.to_string())
            .finish()
    }
}

/// Whether any segment of `location` below `prefix` starts with `_` or `.`.
///
/// Such entries are job markers (`_SUCCESS`), checksums (`.part.crc`) or
/// staging directories (`_temporary`), never table data.
pub fn is_hidden(prefix: &Path, location: &Path) -> bool {
    let hidden = |part: object_store::path::PathPart<'_>| {
        let name = part.as_ref();
        name.starts_with('_') || name.starts_with('.')
    };
    match location.prefix_match(prefix) {
        Some(mut parts) => parts.any(hidden),
        None => location.filename().map_or(false, |name| name.starts_with(['_', '.'])),
    }
}

fn non_root(prefix: &Path) -> Option<&Path> {
    (!prefix.as_ref().is_empty()).then_some(prefix)
}

/// Create a filesystem handle from a connection string
pub fn from_url(connection: &str) -> Result<FileSystemHandle, SetupError> {
    let url = Url::parse(connection).map_err(|source| SetupError::InvalidConnection {
        connection: connection.to_string(),
        source,
    })?;

    let store: Arc<dyn ObjectStore> = match url.scheme() {
        "file" => local::build(&url)?,
        "s3" => s3::build(&url)?,
        "azure" | "az" => azure::build(&url)?,
        "memory" => Arc::new(InMemory::new()),
        scheme => {
            return Err(SetupError::UnsupportedScheme {
                scheme: scheme.to_string(),
                connection: connection.to_string(),
            })
        }
    };
    Ok(FileSystemHandle::new(url, store))
}

/// Bucket or container named by the URL host.
fn bucket_name(url: &Url) -> Result<&str, SetupError> {
    url.host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| SetupError::MissingBucket {
            connection: url.to_string(),
        })
}
