use std::sync::Arc;

use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use url::Url;

use crate::error::SetupError;

/// Local filesystem rooted at the URL path.
pub(super) fn build(url: &Url) -> Result<Arc<dyn ObjectStore>, SetupError> {
    let base_path = url.to_file_path().map_err(|()| {
        SetupError::InvalidConfig(format!("connection '{url}' is not a local path"))
    })?;
    Ok(Arc::new(LocalFileSystem::new_with_prefix(base_path)?))
}
