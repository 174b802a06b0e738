use super::ConfigService;
use crate::error::{ModulithError, Result};
use serde::{Deserialize, Serialize};

/// Name of the settings section holding the persistence configuration
pub const SECTION: &str = "DbConfig";

/// Database settings shared by every module's persistence context.
///
/// When `use_in_memory_db` is set, `provider` and `connection_string` are
/// ignored everywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistenceConfig {
    #[serde(alias = "Provider")]
    pub provider: String,
    #[serde(alias = "ConnectionString")]
    pub connection_string: String,
    #[serde(alias = "UseInMemoryDb")]
    pub use_in_memory_db: bool,
}

#[derive(Deserialize)]
struct SettingsDocument {
    #[serde(rename = "DbConfig", alias = "PersistenceConfig")]
    db_config: Option<PersistenceConfig>,
}

impl PersistenceConfig {
    pub fn in_memory() -> Self {
        Self {
            use_in_memory_db: true,
            ..Self::default()
        }
    }

    pub fn with_provider(provider: impl Into<String>, connection_string: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            connection_string: connection_string.into(),
            use_in_memory_db: false,
        }
    }

    /// Read the `DbConfig` section of a JSON settings document.
    pub fn from_json(document: &str) -> Result<Self> {
        let settings: SettingsDocument = serde_json::from_str(document)?;
        settings.db_config.ok_or_else(|| {
            ModulithError::configuration(format!("settings document has no `{SECTION}` section"))
        })
    }

    /// Apply `DbConfig__*` overrides from `source`.
    pub fn apply_overrides(&mut self, source: &ConfigService) -> Result<()> {
        if let Some(provider) = source.get_section(SECTION, "Provider") {
            self.provider = provider;
        }
        if let Some(connection_string) = source.get_section(SECTION, "ConnectionString") {
            self.connection_string = connection_string;
        }
        if let Some(flag) = source.get_section(SECTION, "UseInMemoryDb") {
            self.use_in_memory_db = flag.trim().to_ascii_lowercase().parse().map_err(|_| {
                ModulithError::configuration(format!(
                    "{SECTION}:UseInMemoryDb must be `true` or `false`, got `{flag}`"
                ))
            })?;
        }
        Ok(())
    }

    /// Defaults, then the settings document (if any), then `overrides`.
    pub fn load(document: Option<&str>, overrides: &ConfigService) -> Result<Self> {
        let mut config = match document {
            Some(document) => Self::from_json(document)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides)?;
        Ok(config)
    }

    /// Provider identifier normalized for lookup (`postgresql` -> `POSTGRESQL`)
    pub fn provider_key(&self) -> String {
        self.provider.trim().to_ascii_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = r#"{
        "Logging": { "LogLevel": { "Default": "Information" } },
        "DbConfig": {
            "Provider": "postgresql",
            "ConnectionString": "Server=localhost;Database=shop",
            "UseInMemoryDb": false
        }
    }"#;

    #[test]
    fn test_from_json_reads_section() {
        let config = PersistenceConfig::from_json(SETTINGS).unwrap();
        assert_eq!(config.provider, "postgresql");
        assert_eq!(config.connection_string, "Server=localhost;Database=shop");
        assert!(!config.use_in_memory_db);
        assert_eq!(config.provider_key(), "POSTGRESQL");
    }

    #[test]
    fn test_from_json_camel_case_and_alias_section() {
        let config = PersistenceConfig::from_json(
            r#"{ "PersistenceConfig": { "provider": "POSTGRESQL", "useInMemoryDb": true } }"#,
        )
        .unwrap();
        assert!(config.use_in_memory_db);
        assert!(config.connection_string.is_empty());
    }

    #[test]
    fn test_from_json_missing_section() {
        let err = PersistenceConfig::from_json(r#"{ "Logging": {} }"#).unwrap_err();
        assert!(matches!(err, ModulithError::Configuration(_)));
        assert!(err.to_string().contains("DbConfig"));
    }

    #[test]
    fn test_environment_overrides_document() {
        let env = ConfigService::from_pairs([
            ("DbConfig__UseInMemoryDb", "True"),
            ("DbConfig__ConnectionString", "Server=override"),
        ]);
        let config = PersistenceConfig::load(Some(SETTINGS), &env).unwrap();

        assert!(config.use_in_memory_db);
        assert_eq!(config.connection_string, "Server=override");
        assert_eq!(config.provider, "postgresql");
    }

    #[test]
    fn test_load_without_document_uses_defaults() {
        let config = PersistenceConfig::load(None, &ConfigService::default()).unwrap();
        assert_eq!(config, PersistenceConfig::default());
    }

    #[test]
    fn test_invalid_in_memory_flag() {
        let env = ConfigService::from_pairs([("DbConfig__UseInMemoryDb", "yes")]);
        let err = PersistenceConfig::load(None, &env).unwrap_err();
        assert!(err.to_string().contains("UseInMemoryDb"));
    }
}
