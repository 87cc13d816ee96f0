//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading `static-pages.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Io(
            PathBuf::from("static-pages.toml"),
            Error::new(ErrorKind::NotFound, "file not found"),
        );
        assert_eq!(
            format!("{err}"),
            "Failed to read config file `static-pages.toml`"
        );

        let err = ConfigError::Validation("[bundler.command] is empty".into());
        assert!(format!("{err}").ends_with("[bundler.command] is empty"));
    }

    #[test]
    fn test_toml_error_source() {
        let toml_err = toml::from_str::<toml::Value>("[pages").unwrap_err();
        let err = ConfigError::from(toml_err);
        assert!(std::error::Error::source(&err).is_some());
    }
}
