use std::{
    env,
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::{Config, ConfigError};

pub const HOME_ENV: &str = "BACKOFFICE_HOME";
const DEFAULT_DIR_NAME: &str = ".backoffice";
const CONFIG_FILE: &str = "config.json";
const STAGING_SUFFIX: &str = ".tmp";

/// `$BACKOFFICE_HOME` when set, else `~/.backoffice`.
pub fn default_base_dir() -> PathBuf {
    if let Some(home) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Loads and saves [`Config`] as pretty JSON.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    base_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(base_dir: PathBuf, config_path: PathBuf) -> Self {
        Self {
            base_dir,
            config_path,
        }
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&base)?;
        let config_path = base.join(CONFIG_FILE);
        Ok(Self::new(base, config_path))
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::with_base_dir(default_base_dir())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Reads the stored config, or defaults when none was saved yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let config = match fs::read_to_string(&self.config_path) {
            Ok(data) => serde_json::from_str(&data).map_err(|err| {
                ConfigError::Serde(format!("{}: {err}", self.config_path.display()))
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => Config::default(),
            Err(err) => return Err(err.into()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates `config` and swaps it in through a sibling temp file.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        replace_file(&self.config_path, json.as_bytes())
    }

    pub fn data_dir(&self, config: &Config) -> PathBuf {
        config.resolve_data_dir(&self.base_dir)
    }
}

fn replace_file(target: &Path, contents: &[u8]) -> Result<(), ConfigError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut staged = target.as_os_str().to_owned();
    staged.push(STAGING_SUFFIX);
    let staged = PathBuf::from(staged);

    let mut file = File::create(&staged)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&staged, target)?;
    Ok(())
}
