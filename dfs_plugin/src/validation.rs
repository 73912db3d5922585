use crate::config::{StorageConfig, WorkspaceConfig};
use crate::error::SetupError;
use crate::formats::FormatPluginConfig;

/// Validates a storage configuration before the plugin is built
pub fn validate_config(config: &StorageConfig) -> Result<(), SetupError> {
    validate_connection(&config.connection)?;
    for (name, workspace) in config.workspaces.iter().flatten() {
        validate_workspace(name, workspace)?;
    }
    for (name, format) in config.formats.iter().flatten() {
        validate_format(name, format)?;
    }
    Ok(())
}

fn invalid(message: String) -> SetupError {
    SetupError::InvalidConfig(message)
}

fn validate_connection(connection: &str) -> Result<(), SetupError> {
    if connection.trim().is_empty() {
        return Err(invalid("connection cannot be empty".to_string()));
    }
    Ok(())
}

/// Workspace names become schema names, so they cannot contain the schema separator
fn validate_workspace(name: &str, workspace: &WorkspaceConfig) -> Result<(), SetupError> {
    if name.is_empty() {
        return Err(invalid("workspace name cannot be empty".to_string()));
    }
    if name.contains('.') {
        return Err(invalid(format!("workspace name '{name}' cannot contain '.'")));
    }
    if workspace.location.trim().is_empty() {
        return Err(invalid(format!("workspace '{name}' has an empty location")));
    }
    Ok(())
}

fn validate_format(name: &str, format: &FormatPluginConfig) -> Result<(), SetupError> {
    if name.is_empty() {
        return Err(invalid("format name cannot be empty".to_string()));
    }
    if let FormatPluginConfig::Text(text) = format {
        if text.extensions.iter().all(|ext| ext.trim().is_empty()) {
            return Err(invalid(format!("text format '{name}' needs at least one extension")));
        }
        if matches!(text.delimiter, '\n' | '\r') {
            return Err(invalid(format!(
                "text format '{name}' cannot use a line terminator as delimiter"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::TextFormatConfig;

    #[test]
    fn test_valid_config() {
        let config = StorageConfig::new("file:///")
            .with_workspace("tmp", WorkspaceConfig::new("/tmp"))
            .with_format(
                "csv",
                FormatPluginConfig::Text(TextFormatConfig::new(["csv"], ',')),
            );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_connection() {
        let config = StorageConfig::new("  ");
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_dotted_workspace_name() {
        let config =
            StorageConfig::new("file:///").with_workspace("a.b", WorkspaceConfig::new("/a"));
        assert!(matches!(validate_config(&config), Err(SetupError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_workspace_location() {
        let config = StorageConfig::new("file:///").with_workspace("tmp", WorkspaceConfig::new(""));
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_text_format_without_extensions() {
        let config = StorageConfig::new("file:///").with_format(
            "csv",
            FormatPluginConfig::Text(TextFormatConfig::new(Vec::<String>::new(), ',')),
        );
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_newline_delimiter() {
        let config = StorageConfig::new("file:///").with_format(
            "lines",
            FormatPluginConfig::Text(TextFormatConfig::new(["txt"], '\n')),
        );
        assert!(validate_config(&config).is_err());
    }
}
