use serde::{Deserialize, Serialize};

use super::{BasicFormatMatcher, FormatPluginConfig};

/// Delimited text files (csv, tsv, psv, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFormatConfig {
    /// File extensions claimed by this format
    pub extensions: Vec<String>,
    /// Field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ','
}

impl TextFormatConfig {
    pub fn new<I, S>(extensions: I, delimiter: char) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            delimiter,
        }
    }
}

impl Default for TextFormatConfig {
    fn default() -> Self {
        Self::new(["csv"], default_delimiter())
    }
}

pub(super) fn matcher(config: &TextFormatConfig) -> BasicFormatMatcher {
    BasicFormatMatcher::new(
        FormatPluginConfig::Text(config.clone()),
        config.extensions.iter().cloned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_defaults_to_comma() {
        let config: TextFormatConfig =
            serde_json::from_str(r#"{"extensions": ["csv"]}"#).unwrap();
        assert_eq!(config.delimiter, ',');
        assert_eq!(config, TextFormatConfig::default());
    }

    #[test]
    fn test_tab_delimiter_round_trips_through_json() {
        let config: TextFormatConfig =
            serde_json::from_str(r#"{"extensions": ["tsv"], "delimiter": "\t"}"#).unwrap();
        assert_eq!(config.delimiter, '\t');
    }
}
