//! Configuration file handling.
//!
//! The configuration file is stored at `$TXN_INSIGHTS_HOME/config.json` and holds the analysis
//! settings along with an optional default input file.

use crate::analysis::{AnalysisOptions, DEFAULT_OUTLIER_THRESHOLD, DEFAULT_TOP_N};
use crate::model::TimestampParser;
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "txn-insights";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$TXN_INSIGHTS_HOME` and from there it loads `$TXN_INSIGHTS_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory and an initial `config.json` with default settings.
    ///
    /// # Errors
    /// - Returns an error if `config.json` already exists.
    /// - Returns an error if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "The config file already exists '{}'",
                config_path.display()
            )
        }

        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    /// Validates that the home directory and `config.json` exist, then loads and validates the
    /// config file.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The home directory is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    /// Loads the configuration if `config.json` exists, otherwise uses the defaults. The home
    /// directory does not need to exist for the defaults to be used.
    pub async fn load_or_default(home: impl Into<PathBuf>) -> Result<Self> {
        let home = home.into();
        let config_path = home.join(CONFIG_JSON);
        if config_path.is_file() {
            return Self::load(home).await;
        }
        debug!(
            "No config file at '{}', using the default configuration",
            config_path.display()
        );
        Ok(Self {
            root: home,
            config_path,
            config_file: ConfigFile::default(),
        })
    }

    /// Writes the current settings to `config.json`.
    pub async fn save(&self) -> Result<()> {
        self.config_file.save(&self.config_path).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn top_n(&self) -> usize {
        self.config_file.top_n
    }

    pub fn outlier_threshold(&self) -> f64 {
        self.config_file.outlier_threshold
    }

    pub fn date_formats(&self) -> &[String] {
        &self.config_file.date_formats
    }

    /// Returns the stored `default_input` if it is absolute, otherwise resolves it against the
    /// home directory.
    pub fn default_input(&self) -> Option<PathBuf> {
        let p = self.config_file.default_input.as_ref()?;
        if p.is_absolute() {
            return Some(p.clone());
        }
        Some(self.root.join(p))
    }

    pub fn set_default_input(&mut self, path: Option<PathBuf>) {
        self.config_file.default_input = path;
    }

    /// Picks the file to analyze: `file` when given, otherwise the configured default.
    ///
    /// # Errors
    /// - Returns an error when neither is available.
    pub fn resolve_input(&self, file: Option<&Path>) -> Result<PathBuf> {
        match file {
            Some(file) => Ok(file.to_path_buf()),
            None => self.default_input().with_context(|| {
                format!(
                    "No input file was given and '{}' has no default_input",
                    self.config_path.display()
                )
            }),
        }
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            top_n: self.top_n(),
            outlier_threshold: self.outlier_threshold(),
        }
    }

    pub fn timestamp_parser(&self) -> TimestampParser {
        TimestampParser::new(self.date_formats().iter().cloned())
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "txn-insights",
///   "config_version": 1,
///   "top_n": 5,
///   "outlier_threshold": 3.0,
///   "date_formats": ["%d.%m.%Y"],
///   "default_input": "transactions.csv"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "txn-insights"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Number of beneficiaries to list per region
    #[serde(default = "default_top_n")]
    top_n: usize,

    /// Z-score above which a credit or debit value is flagged
    #[serde(default = "default_outlier_threshold")]
    outlier_threshold: f64,

    /// chrono format strings tried before the built-in date formats
    #[serde(default)]
    date_formats: Vec<String>,

    /// The CSV analyzed when no file is given (optional, relative to the home directory or
    /// absolute)
    #[serde(skip_serializing_if = "Option::is_none")]
    default_input: Option<PathBuf>,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_outlier_threshold() -> f64 {
    DEFAULT_OUTLIER_THRESHOLD
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            top_n: DEFAULT_TOP_N,
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            date_formats: Vec::new(),
            default_input: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file at {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            self.app_name
        );
        ensure!(self.top_n >= 1, "top_n must be at least 1");
        ensure!(
            self.outlier_threshold.is_finite() && self.outlier_threshold > 0.0,
            "outlier_threshold must be a positive number, got {}",
            self.outlier_threshold
        );
        Ok(())
    }

    /// Saves the ConfigFile to the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("txn_home");

        let config = Config::create(&home_dir).await.unwrap();
        assert!(config.config_path().is_file());
        assert_eq!(config.top_n(), 5);
        assert_eq!(config.outlier_threshold(), 3.0);
        assert!(config.date_formats().is_empty());
        assert!(config.default_input().is_none());

        // A second create must not clobber the file.
        assert!(Config::create(&home_dir).await.is_err());
    }

    #[tokio::test]
    async fn test_config_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::create(dir.path()).await.unwrap();
        config.set_default_input(Some(PathBuf::from("data/tx.csv")));
        config.save().await.unwrap();

        let loaded = Config::load(dir.path()).await.unwrap();
        assert_eq!(loaded.config_file, config.config_file);
        assert_eq!(
            loaded.default_input().unwrap(),
            loaded.root().join("data/tx.csv")
        );
    }

    #[tokio::test]
    async fn test_config_load_missing() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(dir.path()).await.is_err());
        assert!(Config::load(dir.path().join("nope")).await.is_err());
    }

    #[tokio::test]
    async fn test_load_or_default() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("not-created");
        let config = Config::load_or_default(&home).await.unwrap();
        assert_eq!(config.analysis_options(), AnalysisOptions::default());
        assert_eq!(config.root(), home.as_path());
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_JSON);
        let json = r#"{
            "app_name": "txn-insights",
            "config_version": 1,
            "date_formats": ["%d.%m.%Y"]
        }"#;
        utils::write(&path, json).await.unwrap();

        let config = Config::load(dir.path()).await.unwrap();
        assert_eq!(config.top_n(), 5);
        assert_eq!(config.outlier_threshold(), 3.0);
        assert_eq!(config.timestamp_parser().formats(), ["%d.%m.%Y"]);
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_JSON);
        let json = r#"{ "app_name": "wrong_app", "config_version": 1 }"#;
        utils::write(&path, json).await.unwrap();

        let err = ConfigFile::load(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("Invalid app_name"));
    }

    #[test]
    fn test_validate_limits() {
        let mut config = ConfigFile::default();
        assert!(config.validate().is_ok());
        config.top_n = 0;
        assert!(config.validate().is_err());

        let mut config = ConfigFile::default();
        config.outlier_threshold = 0.0;
        assert!(config.validate().is_err());
        config.outlier_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization_omits_default_input() {
        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("default_input"));
        assert!(json.contains("\"top_n\":5"));
    }

    #[test]
    fn test_resolve_input() {
        let mut config = Config {
            root: PathBuf::from("/home/me/txn-insights"),
            config_path: PathBuf::from("/home/me/txn-insights/config.json"),
            config_file: ConfigFile::default(),
        };
        assert!(config.resolve_input(None).is_err());
        assert_eq!(
            config.resolve_input(Some(Path::new("x.csv"))).unwrap(),
            PathBuf::from("x.csv")
        );

        config.set_default_input(Some(PathBuf::from("/data/all.csv")));
        assert_eq!(
            config.resolve_input(None).unwrap(),
            PathBuf::from("/data/all.csv")
        );
    }
}
