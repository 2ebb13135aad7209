use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::data::loader::LoadOptions;
use crate::data::number::NumberFormat;
use crate::data::pipeline::RenderSettings;

/// Dashboard settings: defaults, then an optional JSON file named by
/// `CAGED_CONFIG`, then individual environment overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dataset opened at startup.
    pub data_path: Option<PathBuf>,
    pub delimiter: char,
    pub number_format: NumberFormat,
    pub salary_bin_width: f64,
    pub age_bin_width: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            delimiter: ',',
            number_format: NumberFormat::Brazilian,
            salary_bin_width: 500.0,
            age_bin_width: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("CAGED_DELIMITER must be a single ASCII character, got '{0}'")]
    InvalidDelimiter(String),
    #[error("CAGED_NUMBER_FORMAT must be 'brazilian' or 'plain', got '{0}'")]
    InvalidNumberFormat(String),
    #[error("bin widths must be positive")]
    InvalidBinWidth,
}

impl DashboardConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var_os("CAGED_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(path) = env::var("CAGED_DATA_PATH") {
            config.data_path = Some(PathBuf::from(path));
        }
        if let Ok(raw) = env::var("CAGED_DELIMITER") {
            let mut chars = raw.chars();
            config.delimiter = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(ConfigError::InvalidDelimiter(raw)),
            };
        }
        if let Ok(raw) = env::var("CAGED_NUMBER_FORMAT") {
            config.number_format =
                NumberFormat::from_token(&raw).ok_or(ConfigError::InvalidNumberFormat(raw))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.delimiter.is_ascii() {
            return Err(ConfigError::InvalidDelimiter(self.delimiter.to_string()));
        }
        if self.salary_bin_width.is_nan() || self.salary_bin_width <= 0.0 || self.age_bin_width == 0 {
            return Err(ConfigError::InvalidBinWidth);
        }
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            // `validate` guarantees an ASCII delimiter.
            delimiter: self.delimiter as u8,
            number_format: self.number_format,
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            age_bin_width: self.age_bin_width,
            salary_bin_width: self.salary_bin_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("CAGED_CONFIG");
        env::remove_var("CAGED_DATA_PATH");
        env::remove_var("CAGED_DELIMITER");
        env::remove_var("CAGED_NUMBER_FORMAT");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = DashboardConfig::load().expect("config loads with defaults");
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.load_options().delimiter, b',');
    }

    #[test]
    fn env_overrides_apply() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CAGED_DATA_PATH", "/data/caged-pe.csv");
        env::set_var("CAGED_DELIMITER", ";");
        env::set_var("CAGED_NUMBER_FORMAT", "plain");
        let config = DashboardConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.data_path, Some(PathBuf::from("/data/caged-pe.csv")));
        assert_eq!(config.load_options().delimiter, b';');
        assert_eq!(config.number_format, NumberFormat::Plain);
    }

    #[test]
    fn rejects_bad_env_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CAGED_DELIMITER", ";;");
        assert!(matches!(
            DashboardConfig::load(),
            Err(ConfigError::InvalidDelimiter(_))
        ));
        reset_env();
        env::set_var("CAGED_NUMBER_FORMAT", "fr");
        assert!(matches!(
            DashboardConfig::load(),
            Err(ConfigError::InvalidNumberFormat(_))
        ));
        reset_env();
    }

    #[test]
    fn reads_partial_json_file() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            br#"{ "delimiter": ";", "number_format": "brazilian", "salary_bin_width": 250.0 }"#,
        )
        .expect("write config");
        env::set_var("CAGED_CONFIG", file.path());
        let config = DashboardConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.delimiter, ';');
        assert_eq!(config.salary_bin_width, 250.0);
        assert_eq!(config.age_bin_width, 5);
        assert_eq!(config.render_settings().salary_bin_width, 250.0);
    }

    #[test]
    fn zero_bin_width_is_rejected() {
        let config = DashboardConfig {
            age_bin_width: 0,
            ..DashboardConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBinWidth)));
    }
}
