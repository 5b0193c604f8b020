use serde::{de::Deserializer, Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::ConfigError;

/// Operator-tunable settings for a back office installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the collection files. Defaults to `<base>/data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Default `tracing` directive applied on top of `RUST_LOG`.
    #[serde(default = "Config::default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub allocator: AllocatorSettings,
    #[serde(default)]
    pub hierarchy: HierarchySettings,
    #[serde(default)]
    pub pagination: PaginationSettings,
    #[serde(default = "Config::default_daily_book_prefix")]
    pub daily_book_prefix: String,
    #[serde(default = "Config::default_provider_prefix")]
    pub provider_prefix: String,
    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_filter: Self::default_log_filter(),
            allocator: AllocatorSettings::default(),
            hierarchy: HierarchySettings::default(),
            pagination: PaginationSettings::default(),
            daily_book_prefix: Self::default_daily_book_prefix(),
            provider_prefix: Self::default_provider_prefix(),
            ui_color_enabled: Self::default_ui_color_enabled(),
        }
    }
}

impl Config {
    pub fn default_log_filter() -> String {
        "backoffice=info".into()
    }

    pub fn default_daily_book_prefix() -> String {
        "AS".into()
    }

    pub fn default_provider_prefix() -> String {
        "PRV".into()
    }

    pub fn default_ui_color_enabled() -> bool {
        true
    }

    pub fn resolve_data_dir(&self, base: &Path) -> PathBuf {
        match &self.data_dir {
            Some(path) => path.clone(),
            None => base.join("data"),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, prefix) in [
            ("daily_book_prefix", &self.daily_book_prefix),
            ("provider_prefix", &self.provider_prefix),
        ] {
            if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be non-empty and alphanumeric, got `{prefix}`"
                )));
            }
        }
        let pagination = &self.pagination;
        if pagination.max_limit == 0 {
            return Err(ConfigError::Invalid("pagination.max_limit must be at least 1".into()));
        }
        if pagination.default_limit == 0 || pagination.default_limit > pagination.max_limit {
            return Err(ConfigError::Invalid(format!(
                "pagination.default_limit must be between 1 and {}",
                pagination.max_limit
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorSettings {
    #[serde(default = "AllocatorSettings::default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "AllocatorSettings::default_backoff_ms")]
    pub backoff_ms: u64,
}

impl AllocatorSettings {
    pub fn default_max_retries() -> u32 {
        5
    }

    pub fn default_backoff_ms() -> u64 {
        100
    }
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            backoff_ms: Self::default_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchySettings {
    #[serde(default)]
    pub strategy: HierarchyStrategy,
}

/// How chart codes are assigned; unknown values fall back to `atomic`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HierarchyStrategy {
    #[default]
    Atomic,
    ReadMax,
}

impl HierarchyStrategy {
    fn from_value(value: Option<String>) -> Self {
        value
            .map(|v| HierarchyStrategy::parse(&v))
            .unwrap_or_default()
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "read-max" | "readmax" => HierarchyStrategy::ReadMax,
            _ => HierarchyStrategy::Atomic,
        }
    }
}

impl fmt::Display for HierarchyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HierarchyStrategy::Atomic => "atomic",
            HierarchyStrategy::ReadMax => "read-max",
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for HierarchyStrategy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(HierarchyStrategy::from_value(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationSettings {
    #[serde(default = "PaginationSettings::default_limit")]
    pub default_limit: u64,
    #[serde(default = "PaginationSettings::default_max_limit")]
    pub max_limit: u64,
}

impl PaginationSettings {
    pub fn default_limit() -> u64 {
        10
    }

    pub fn default_max_limit() -> u64 {
        100
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: Self::default_limit(),
            max_limit: Self::default_max_limit(),
        }
    }
}
