use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ERROR_CLASS: &str = "custom-block-error";

/// Highest call depth a block may be given. Larger configured values are
/// lowered to this so that nested calls stay within the mount thread's stack.
pub const MAX_CALL_DEPTH_CEILING: usize = 512;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Settings for mounting custom blocks. Every field may be omitted from the
/// config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MountOptions {
    /// Nested calls allowed inside a block before it fails with a
    /// `RangeError`. Capped at [`MAX_CALL_DEPTH_CEILING`].
    pub max_call_depth: usize,
    /// Class of the placeholder element shown for a failed block.
    pub error_class: String,
}

impl Default for MountOptions {
    fn default() -> Self {
        MountOptions {
            max_call_depth: interpreter::BindOptions::default().max_call_depth,
            error_class: DEFAULT_ERROR_CLASS.to_string(),
        }
    }
}

impl MountOptions {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_path = config_path.as_ref();
        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
            config_path: config_path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn bind_options(&self) -> interpreter::BindOptions {
        interpreter::BindOptions {
            max_call_depth: self.max_call_depth.min(MAX_CALL_DEPTH_CEILING),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_fields_use_defaults() {
        let file = write_config("max_call_depth = 8\n");
        let options = MountOptions::load_from_path(file.path()).unwrap();
        assert_eq!(options.max_call_depth, 8);
        assert_eq!(options.error_class, DEFAULT_ERROR_CLASS);
    }

    #[test]
    fn empty_file_is_default() {
        let file = write_config("");
        assert_eq!(
            MountOptions::load_from_path(file.path()).unwrap(),
            MountOptions::default()
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let file = write_config("cache = true\n");
        let err = MountOptions::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MountOptions::load_from_path(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigReadError { .. }));
    }

    #[test]
    fn call_depth_is_capped_when_binding() {
        let options = MountOptions {
            max_call_depth: 1_000_000,
            ..MountOptions::default()
        };
        assert_eq!(options.bind_options().max_call_depth, MAX_CALL_DEPTH_CEILING);
        assert_eq!(MountOptions::default().bind_options().max_call_depth, 64);
    }

    #[test]
    fn options_roundtrip_through_toml() {
        let options = MountOptions {
            max_call_depth: 12,
            error_class: "broken".to_string(),
        };
        let text = toml::to_string(&options).unwrap();
        assert_eq!(toml::from_str::<MountOptions>(&text).unwrap(), options);
    }
}
