//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_valid_file() {
        let file = write_config("[listener]\nbind_address = \"127.0.0.1:9000\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn distinguishes_failure_kinds() {
        let missing = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));

        let garbled = write_config("[listener\n");
        assert!(matches!(
            load_config(garbled.path()).unwrap_err(),
            ConfigError::Parse(_)
        ));

        let invalid = write_config("[limits]\nmax_body_bytes = 0\n");
        let err = load_config(invalid.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert_eq!(
            err.to_string(),
            "Validation failed: limits.max_body_bytes: must be greater than zero"
        );
    }
}
