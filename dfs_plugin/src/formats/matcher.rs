use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use object_store::ObjectMeta;

use super::{FormatMatcher, FormatPluginConfig};
use crate::storage::FileSystemHandle;

/// Matches files by extension and, optionally, by leading magic bytes.
#[derive(Debug, Clone)]
pub struct BasicFormatMatcher {
    config: FormatPluginConfig,
    extensions: Vec<String>,
    magic: Option<Bytes>,
}

impl BasicFormatMatcher {
    pub fn new<I, S>(config: FormatPluginConfig, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            config,
            extensions: extensions
                .into_iter()
                .map(|ext| ext.into().to_ascii_lowercase())
                .collect(),
            magic: None,
        }
    }

    /// Also require the file to start with `magic`.
    pub fn with_magic(mut self, magic: &'static [u8]) -> Self {
        self.magic = Some(Bytes::from_static(magic));
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

#[async_trait]
impl FormatMatcher for BasicFormatMatcher {
    fn format_config(&self) -> &FormatPluginConfig {
        &self.config
    }

    async fn is_readable(
        &self,
        fs: &FileSystemHandle,
        file: &ObjectMeta,
    ) -> object_store::Result<bool> {
        if !self.matches_extension(&file.location) {
            return Ok(false);
        }
        let Some(magic) = &self.magic else {
            return Ok(true);
        };
        if file.size < magic.len() {
            return Ok(false);
        }
        let head = fs.read_prefix(&file.location, magic.len()).await?;
        Ok(head == *magic)
    }
}
