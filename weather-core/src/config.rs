use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// Date tokens accepted in `[columns.Date] unit`, mapped to chrono patterns.
const DATE_FORMATS: &[(&str, &str)] = &[("YYYY-MM-DD", crate::dates::ISO_DATE)];

/// Description and unit for a single observed column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default)]
    pub description: String,
    pub unit: String,
}

/// Configuration as read from disk, before validation.
///
/// Example TOML:
/// ```toml
/// api_token = "abcdef"
/// app_host = "127.0.0.1:3000"
/// db_connection_string = "sqlite://weather.db"
///
/// [columns.Temperature]
/// description = "Air temperature"
/// unit = "°C"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_token: Option<String>,
    pub app_host: Option<String>,
    pub db_connection_string: Option<String>,

    #[serde(default)]
    pub columns: HashMap<String, ColumnConfig>,
}

/// Display and parse units for each column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitConfig {
    /// chrono pattern used to parse and render stored dates.
    pub date_format: String,
    pub humidity_unit: String,
    pub temperature_unit: String,
}

impl UnitConfig {
    /// Units used when nothing else is configured: ISO dates, `%` and `°C`.
    pub fn metric() -> Self {
        Self {
            date_format: crate::dates::ISO_DATE.to_string(),
            humidity_unit: "%".to_string(),
            temperature_unit: "°C".to_string(),
        }
    }
}

/// Validated process settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_token: String,
    pub listen_addr: String,
    pub database_url: String,
    pub units: UnitConfig,
}

impl Config {
    /// Load config from `path`, or from the platform config dir when `path` is `None`.
    ///
    /// A missing file at the default location yields an empty config; a missing
    /// file at an explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::config_file_path()?;
                if !path.exists() {
                    return Ok(Self::default());
                }
                Self::load_from(&path)
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Path to the default config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-server")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Replace file values with `API_TOKEN`, `APP_HOST` and `DB_CONNECTION_STRING`
    /// from the process environment when they are set.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |key: &str, slot: &mut Option<String>| {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = Some(value);
            }
        };

        set("API_TOKEN", &mut self.api_token);
        set("APP_HOST", &mut self.app_host);
        set("DB_CONNECTION_STRING", &mut self.db_connection_string);
    }

    /// Validate into [`Settings`]. Every value is required.
    pub fn into_settings(self) -> Result<Settings> {
        let api_token = required(self.api_token, "api_token (API_TOKEN)")?;
        let listen_addr = required(self.app_host, "app_host (APP_HOST)")?;
        let database_url = required(
            self.db_connection_string,
            "db_connection_string (DB_CONNECTION_STRING)",
        )?;

        let unit = |name: &str| -> Result<String> {
            let unit = self
                .columns
                .get(name)
                .map(|c| c.unit.clone())
                .filter(|u| !u.is_empty());
            unit.ok_or_else(|| anyhow!("Missing unit for column '{name}' in [columns.{name}]"))
        };

        let date_token = unit("Date")?;
        let date_format = DATE_FORMATS
            .iter()
            .find(|(token, _)| *token == date_token)
            .map(|(_, pattern)| pattern.to_string())
            .ok_or_else(|| {
                anyhow!("Invalid date format '{date_token}' for column 'Date'. Supported: YYYY-MM-DD.")
            })?;

        Ok(Settings {
            api_token,
            listen_addr,
            database_url,
            units: UnitConfig {
                date_format,
                humidity_unit: unit("Humidity")?,
                temperature_unit: unit("Temperature")?,
            },
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("Required setting {name} is not set"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
api_token = "abcdef"
app_host = "127.0.0.1:3000"
db_connection_string = "sqlite://:memory:"

[columns.Date]
description = "Observation day"
unit = "YYYY-MM-DD"

[columns.Humidity]
description = "Relative humidity"
unit = "%"

[columns.Temperature]
description = "Air temperature"
unit = "°C"
"#;

    fn parse(s: &str) -> Config {
        toml::from_str(s).expect("config must parse")
    }

    #[test]
    fn full_config_validates() {
        let settings = parse(FULL).into_settings().expect("settings must validate");

        assert_eq!(settings.api_token, "abcdef");
        assert_eq!(settings.listen_addr, "127.0.0.1:3000");
        assert_eq!(settings.database_url, "sqlite://:memory:");
        assert_eq!(settings.units, UnitConfig::metric());
    }

    #[test]
    fn missing_token_fails() {
        let mut cfg = parse(FULL);
        cfg.api_token = None;

        let err = cfg.into_settings().unwrap_err();
        assert!(err.to_string().contains("API_TOKEN"));
    }

    #[test]
    fn missing_column_fails() {
        let mut cfg = parse(FULL);
        cfg.columns.remove("Humidity");

        let err = cfg.into_settings().unwrap_err();
        assert!(err.to_string().contains("Humidity"));
    }

    #[test]
    fn unknown_date_token_fails() {
        let mut cfg = parse(FULL);
        cfg.columns.insert(
            "Date".into(),
            ColumnConfig { description: String::new(), unit: "DD.MM.YY".into() },
        );

        let err = cfg.into_settings().unwrap_err();
        assert!(err.to_string().contains("Invalid date format"));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = parse(FULL);
        cfg.apply_overrides(|key| match key {
            "API_TOKEN" => Some("from-env".into()),
            "APP_HOST" => Some(String::new()),
            _ => None,
        });

        assert_eq!(cfg.api_token.as_deref(), Some("from-env"));
        // empty values are ignored
        assert_eq!(cfg.app_host.as_deref(), Some("127.0.0.1:3000"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(FULL.as_bytes()).expect("write config");

        let cfg = Config::load(Some(file.path())).expect("config must load");
        assert_eq!(cfg.columns.len(), 3);
    }

    #[test]
    fn load_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();

        assert!(err.to_string().contains("Failed to read config file"));
    }
}
