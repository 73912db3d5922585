use std::sync::Arc;

use object_store::azure::MicrosoftAzureBuilder;
use object_store::ObjectStore;
use url::Url;

use super::bucket_name;
use crate::error::SetupError;

/// Azure blob container named by the URL host; the account comes from the environment.
pub(super) fn build(url: &Url) -> Result<Arc<dyn ObjectStore>, SetupError> {
    let container = bucket_name(url)?;
    let store = MicrosoftAzureBuilder::from_env()
        .with_container_name(container)
        .build()?;
    Ok(Arc::new(store))
}
