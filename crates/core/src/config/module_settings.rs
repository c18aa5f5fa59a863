use std::collections::BTreeMap;

/// Free-form key/value settings for one module, as read from its
/// `[modules.<name>]` table. Non-string values are kept in their TOML form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSettings {
    values: BTreeMap<String, String>,
}

impl ModuleSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build settings from a config value; anything that is not a table
    /// yields empty settings.
    pub fn from_value(value: &toml::Value) -> Self {
        let mut settings = Self::new();
        if let Some(table) = value.as_table() {
            for (key, value) in table {
                let text = match value {
                    toml::Value::String(s) => s.clone(),
                    toml::Value::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            toml::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(","),
                    other => other.to_string(),
                };
                settings.values.insert(key.clone(), text);
            }
        }
        settings
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value for `key` with surrounding whitespace removed, `None` when blank
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Comma separated list, blank entries dropped
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get_non_blank(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get_non_blank(key).and_then(|v| v.parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_table_stringifies_values() {
        let value: toml::Value = toml::from_str(
            r#"
command = "cov"
timeout = 30
ignore_paths = ["vendor", "target"]
"#,
        )
        .unwrap();

        let settings = ModuleSettings::from_value(&value);
        assert_eq!(settings.get("command"), Some("cov"));
        assert_eq!(settings.get_u64("timeout"), Some(30));
        assert_eq!(settings.get_list("ignore_paths"), vec!["vendor", "target"]);
    }

    #[test]
    fn test_flat_value_yields_empty_settings() {
        let settings = ModuleSettings::from_value(&toml::Value::Boolean(true));
        assert!(settings.is_empty());
    }

    #[test]
    fn test_blank_values_are_treated_as_missing() {
        let settings = ModuleSettings::new().with("class", "   ").with("root", " src ");
        assert_eq!(settings.get_non_blank("class"), None);
        assert_eq!(settings.get_non_blank("root"), Some("src"));
        assert!(settings.get_list("class").is_empty());
    }
}
