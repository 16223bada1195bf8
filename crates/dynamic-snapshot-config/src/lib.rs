use dynamic_snapshot_engine::{
    ConfigurationError, DynamicSnapshot, Fetcher, FileStore, IgnoredLines, SnapshotError,
    SnapshotStore, StoreError, SubstitutionTable, SubstitutionValue, Wrappers,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "dynamic-snapshot.toml";

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

    #[error("Invalid setting in config file at {config_path}: {source}")]
    ConfigValidationError {
        config_path: PathBuf,
        source: ConfigurationError,
    },

    #[error("Invalid snapshot setting: {0}")]
    InvalidSetting(#[from] SnapshotError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperConfig {
    pub left: String,
    pub right: String,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        let wrappers = Wrappers::default();
        Self {
            left: wrappers.left().to_string(),
            right: wrappers.right().to_string(),
        }
    }
}

/// Settings shared by the snapshot tests of a project.
///
/// Scalar settings come first so the file serializes as valid TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub snapshot_dir: PathBuf,
    pub allow_trailing_spaces: bool,
    pub allow_space_sequences: bool,
    pub show_diff: bool,
    pub refresh: bool,
    pub ignored_lines: Vec<String>,
    pub wrappers: WrapperConfig,
    pub substitutions: toml::Table,
    pub strict_substitutions: toml::Table,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("tests/snapshots"),
            allow_trailing_spaces: false,
            allow_space_sequences: false,
            show_diff: true,
            refresh: false,
            ignored_lines: Vec::new(),
            wrappers: WrapperConfig::default(),
            substitutions: toml::Table::new(),
            strict_substitutions: toml::Table::new(),
        }
    }
}

impl SnapshotConfig {
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

        let mut config: SnapshotConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config
            .validate()
            .map_err(|source| ConfigError::ConfigValidationError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the snapshot directory
        config.snapshot_dir =
            Self::expand_path(&config.snapshot_dir).unwrap_or(config.snapshot_dir);

        log::debug!("Loaded snapshot config from {}", config_path.display());
        Ok(Some(config))
    }

    /// Load from the default location, falling back to defaults when absent.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self::load_from_path(Self::config_path())?.unwrap_or_default())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Check every setting the engine would reject, without a snapshot.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        IgnoredLines::new(&self.ignored_lines)?;
        self.substitution_table()?.ensure_placeholders_unambiguous()
    }

    pub fn wrappers(&self) -> Result<Wrappers, ConfigurationError> {
        Wrappers::new(self.wrappers.left.as_str(), self.wrappers.right.as_str())
    }

    /// Both substitution tables, strict entries registered after plain ones.
    pub fn substitution_table(&self) -> Result<SubstitutionTable, ConfigurationError> {
        let mut table = SubstitutionTable::new(self.wrappers()?);
        table.set_substitutions(substitution_values(&self.substitutions))?;
        table.set_strict_substitutions(substitution_values(&self.strict_substitutions))?;
        Ok(table)
    }

    /// Push every setting into `snapshot`.
    pub fn apply<S, F>(&self, snapshot: &mut DynamicSnapshot<S, F>) -> Result<(), ConfigError>
    where
        S: SnapshotStore,
        F: Fetcher,
    {
        snapshot.set_wrappers(&self.wrappers.left, &self.wrappers.right)?;
        snapshot.should_allow_trailing_spaces(self.allow_trailing_spaces);
        snapshot.should_allow_space_sequences(self.allow_space_sequences);
        snapshot.should_show_diff(self.show_diff);
        snapshot.should_refresh_snapshot(self.refresh);
        snapshot.set_ignored_lines_patterns(&self.ignored_lines)?;
        snapshot.set_substitutions(substitution_values(&self.substitutions))?;
        snapshot.set_strict_substitutions(substitution_values(&self.strict_substitutions))?;
        Ok(())
    }

    pub fn open_store(&self) -> Result<FileStore, StoreError> {
        FileStore::open(&self.snapshot_dir)
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

fn substitution_values(
    table: &toml::Table,
) -> impl Iterator<Item = (String, SubstitutionValue)> + '_ {
    table
        .iter()
        .map(|(key, value)| (key.clone(), substitution_value(value)))
}

fn substitution_value(value: &toml::Value) -> SubstitutionValue {
    match value {
        toml::Value::String(text) => text.into(),
        toml::Value::Integer(number) => (*number).into(),
        toml::Value::Float(number) => (*number).into(),
        toml::Value::Boolean(flag) => (*flag).into(),
        toml::Value::Datetime(datetime) => datetime.to_string().into(),
        toml::Value::Array(_) => SubstitutionValue::structured("array"),
        toml::Value::Table(_) => SubstitutionValue::structured("table"),
    }
}
