use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use url::Url;

use super::bucket_name;
use crate::error::SetupError;

/// S3 bucket named by the URL host; credentials and region come from the environment.
pub(super) fn build(url: &Url) -> Result<Arc<dyn ObjectStore>, SetupError> {
    let bucket = bucket_name(url)?;
    let store = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .with_allow_http(true)
        .build()?;
    Ok(Arc::new(store))
}
