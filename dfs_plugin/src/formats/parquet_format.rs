use serde::{Deserialize, Serialize};

use super::{BasicFormatMatcher, FormatPluginConfig};

/// Every parquet file starts (and ends) with these bytes.
pub(crate) const PARQUET_MAGIC: &[u8] = b"PAR1";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParquetFormatConfig {}

pub(super) fn matcher(config: &ParquetFormatConfig) -> BasicFormatMatcher {
    BasicFormatMatcher::new(FormatPluginConfig::Parquet(config.clone()), ["parquet"])
        .with_magic(PARQUET_MAGIC)
}
