use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Build order used when `build_order` is unset or unusable
pub const DEFAULT_BUILD_ORDER: &str = "cs,test,coverage";

/// Project configuration loaded from `.qualis/config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<String>,

    /// Kept untyped: any non-string value falls back to the default order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_order: Option<toml::Value>,

    /// Module name -> settings table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<toml::Value>,

    #[serde(skip)]
    raw: toml::Table,
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: toml::Table = contents.parse()?;
        let mut config: Config = toml::Value::Table(raw.clone()).try_into()?;
        config.raw = raw;
        Ok(config)
    }

    /// Look up a raw value, either top-level or inside a `[section]` table
    pub fn get(&self, key: &str, section: Option<&str>) -> Option<&toml::Value> {
        match section {
            None => self.raw.get(key),
            Some(section) => self.raw.get(section)?.as_table()?.get(key),
        }
    }

    /// The configured build order, or [`DEFAULT_BUILD_ORDER`] when the value
    /// is missing, not a string, or blank
    pub fn build_order(&self) -> &str {
        match self.build_order.as_ref().and_then(toml::Value::as_str) {
            Some(order) if !order.trim().is_empty() => order,
            _ => DEFAULT_BUILD_ORDER,
        }
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}
