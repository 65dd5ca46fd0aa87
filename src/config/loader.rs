//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::store::ConfigStore;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration file")]
    Parse(#[from] toml::de::Error),
}

/// Load a [`ConfigStore`] from a TOML file.
///
/// Absent fields fall back to their defaults. Plugins and interceptors
/// cannot be expressed in a file; register them programmatically afterwards.
pub fn load_config(path: &Path) -> Result<ConfigStore, ConfigError> {
    let content = fs::read_to_string(path)?;
    let store: ConfigStore = toml::from_str(&content)?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::store::CompressionStrategy;
    use std::io::Write;

    #[test]
    fn absent_fields_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "max_request_size = 2048\n\
             enforce_ssl = true\n\
             compression = \"none\"\n\
             \n\
             [routing]\n\
             ignore_trailing_slashes = false\n"
        )
        .unwrap();

        let store = load_config(file.path()).unwrap();
        assert_eq!(store.max_request_size, 2048);
        assert!(store.enforce_ssl);
        assert_eq!(store.compression, CompressionStrategy::None);
        assert!(!store.routing.ignore_trailing_slashes);
        assert_eq!(store.async_request_timeout_ms, 0);
        assert_eq!(store.context_path, "/");
    }

    #[test]
    fn parse_errors_are_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "max_request_size = \"plenty\"").unwrap();

        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let missing = Path::new("/nonexistent/app-shell.toml");
        assert!(matches!(load_config(missing), Err(ConfigError::Io(_))));
    }
}
