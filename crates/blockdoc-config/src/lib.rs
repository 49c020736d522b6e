use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

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

/// User configuration, stored as TOML.
///
/// ```toml
/// document_path = "~/notes/today.md"
/// log_file = "$HOME/.cache/blockdoc/blockdoc.log"
///
/// [schema]
/// "$root" = ["paragraph", "heading1", "listItem", "blockQuote"]
/// blockQuote = ["listItem"]
/// ```
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Document opened when no path is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Container name to allowed children. Empty means the built-in schema.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schema: BTreeMap<String, Vec<String>>,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded paths
        config.document_path = config
            .document_path
            .map(|path| Self::expand_path(&path).unwrap_or(path));
        config.log_file = config
            .log_file
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/blockdoc");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Configured log file, or the default under `~/.cache`.
    pub fn log_file_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            let cache_dir = shellexpand::tilde("~/.cache/blockdoc");
            PathBuf::from(cache_dir.as_ref()).join("blockdoc.log")
        })
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/blockdoc/config.toml"));
    }

    #[test]
    fn test_default_log_file_path() {
        let path = Config::default().log_file_path();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with(".cache/blockdoc/blockdoc.log"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            document_path: Some(PathBuf::from("/tmp/doc.md")),
            log_file: None,
            schema: BTreeMap::from([(
                "$root".to_string(),
                vec!["paragraph".to_string(), "listItem".to_string()],
            )]),
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("BLOCKDOC_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$BLOCKDOC_TEST_VAR/doc.md");
        let expanded = Config::expand_path(&path);

        assert_eq!(expanded, Some(PathBuf::from("/test/env/path/doc.md")));

        unsafe {
            env::remove_var("BLOCKDOC_TEST_VAR");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "schema = 42").unwrap();

        let result = Config::load_from_path(&config_file);

        assert!(matches!(
            result,
            Err(ConfigError::ConfigParseError { config_path, .. }) if config_path == config_file
        ));
    }

    #[test]
    fn test_written_config_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested/config.toml");
        let test_config = Config {
            document_path: Some(PathBuf::from("/tmp/notes.md")),
            log_file: Some(PathBuf::from("/tmp/blockdoc.log")),
            schema: BTreeMap::new(),
        };

        std::fs::create_dir_all(config_file.parent().unwrap()).unwrap();
        std::fs::write(&config_file, toml::to_string_pretty(&test_config).unwrap()).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_schema_table_in_toml() {
        let config_content = r#"
[schema]
"$root" = ["paragraph", "blockQuote"]
blockQuote = ["listItem"]
"#;

        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.schema["$root"], vec!["paragraph", "blockQuote"]);
        assert_eq!(config.schema["blockQuote"], vec!["listItem"]);
    }

    #[test]
    fn test_config_with_tilde_in_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "document_path = \"~/notes/today.md\"\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();
        let path = config.document_path.unwrap();

        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("notes/today.md"));
    }
}
