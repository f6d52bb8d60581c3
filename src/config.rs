//! CLI settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NlSqlError, NlSqlResult};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "nlsql.toml";

/// How the one-shot command prints its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Bare SQL text
    #[default]
    Sql,
    /// `{ "intent": ..., "sql": ... }`
    Json,
}

/// Settings read from `nlsql.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the schema document (JSON or TOML)
    pub schema_path: Option<PathBuf>,

    /// Output format for one-shot requests
    #[serde(default)]
    pub format: OutputFormat,

    /// Print the parsed intent before the SQL
    #[serde(default)]
    pub show_intent: bool,

    /// Fallback filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_path: None,
            format: OutputFormat::Sql,
            show_intent: false,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Create a new settings builder
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    pub fn from_toml_str(input: &str) -> NlSqlResult<Self> {
        toml::from_str(input).map_err(|e| NlSqlError::Config(e.to_string()))
    }

    /// Read settings from one file.
    pub fn from_file(path: impl AsRef<Path>) -> NlSqlResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&content)
            .map_err(|e| NlSqlError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Resolve settings.
    ///
    /// An explicit path must exist. Otherwise `./nlsql.toml` is tried, then
    /// `<config dir>/nlsql/config.toml`, then defaults.
    pub fn load(explicit: Option<&Path>) -> NlSqlResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        Self::first_existing(&default_locations())
    }

    fn first_existing(candidates: &[PathBuf]) -> NlSqlResult<Self> {
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("nlsql").join("config.toml"));
    }
    paths
}

/// Builder for Settings
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Set the schema path
    pub fn schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.schema_path = Some(path.into());
        self
    }

    /// Set the output format
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.settings.format = format;
        self
    }

    pub fn show_intent(mut self, show: bool) -> Self {
        self.settings.show_intent = show;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.settings.log_level = level.into();
        self
    }

    /// Build the settings
    pub fn build(self) -> Settings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_file() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.format, OutputFormat::Sql);
    }

    #[test]
    fn test_parse_all_keys() {
        let settings = Settings::from_toml_str(
            r#"
schema_path = "schemas/members.json"
format = "json"
show_intent = true
log_level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(
            settings,
            Settings::builder()
                .schema("schemas/members.json")
                .format(OutputFormat::Json)
                .show_intent(true)
                .log_level("debug")
                .build()
        );
    }

    #[test]
    fn test_bad_format_is_config_error() {
        let err = Settings::from_toml_str("format = \"yaml\"").unwrap_err();
        assert!(matches!(err, NlSqlError::Config(_)));
    }

    #[test]
    fn test_explicit_path_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "show_intent = true").unwrap();
        let settings = Settings::load(Some(file.path())).unwrap();
        assert!(settings.show_intent);
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, NlSqlError::Io(_)));
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let second = dir.path().join("second.toml");
        std::fs::write(&second, "log_level = \"info\"").unwrap();
        let third = dir.path().join("third.toml");
        std::fs::write(&third, "log_level = \"trace\"").unwrap();

        let candidates = vec![dir.path().join("first.toml"), second, third];
        let settings = Settings::first_existing(&candidates).unwrap();
        assert_eq!(settings.log_level, "info");

        let none = Settings::first_existing(&[dir.path().join("nope.toml")]).unwrap();
        assert_eq!(none, Settings::default());
    }
}
