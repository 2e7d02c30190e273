use outlay_core::Money;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "outlay.toml";

/// Defaults for the flags every subcommand would otherwise need. CLI
/// arguments override each field.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub folder: Option<PathBuf>,
    pub rules: Option<PathBuf>,
    pub budget: Option<Money>,
    pub cutoff_day: Option<u32>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl FileConfig {
    /// Loads the explicit path, or `outlay.toml` from the working
    /// directory when present, or empty defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_path(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A setting that must come from the CLI flag or the config file.
pub fn merge<T>(flag: &str, cli: Option<T>, file: Option<T>) -> anyhow::Result<T> {
    cli.or(file)
        .ok_or_else(|| anyhow::anyhow!("--{flag} is required (pass the flag or set it in {DEFAULT_CONFIG_FILE})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_all_fields() {
        let config: FileConfig = toml::from_str(
            r#"
            folder = "exports"
            rules = "classification.csv"
            budget = "1500.00"
            cutoff_day = 15
            "#,
        )
        .unwrap();
        assert_eq!(config.folder.as_deref(), Some(Path::new("exports")));
        assert_eq!(config.budget.unwrap().to_cents(), 150_000);
        assert_eq!(config.cutoff_day, Some(15));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<FileConfig, _> = toml::from_str("budgte = \"100\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outlay.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "budget = \"250.50\"").unwrap();

        let config = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(config.budget.unwrap().to_cents(), 25_050);
    }

    #[test]
    fn load_missing_explicit_path_errors() {
        let result = FileConfig::load(Some(Path::new("/no/such/outlay.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn merge_prefers_cli_over_file() {
        assert_eq!(merge("months", Some(3), Some(6)).unwrap(), 3);
        assert_eq!(merge("months", None, Some(6)).unwrap(), 6);
        assert!(merge::<u32>("months", None, None).is_err());
    }
}
