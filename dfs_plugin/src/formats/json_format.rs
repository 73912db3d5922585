use serde::{Deserialize, Serialize};

use super::{BasicFormatMatcher, FormatPluginConfig};

/// Newline-delimited JSON records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JsonFormatConfig {}

pub(super) fn matcher(config: &JsonFormatConfig) -> BasicFormatMatcher {
    BasicFormatMatcher::new(FormatPluginConfig::Json(config.clone()), ["json"])
}
