//! Database provider selection

use crate::error::{ModulithError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Closed set of supported database engines.
///
/// Parsing is case-insensitive: `postgresql`, `PostgreSQL` and `POSTGRESQL`
/// all select [`DbProvider::PostgreSql`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum DbProvider {
    #[strum(serialize = "POSTGRESQL")]
    #[serde(rename = "POSTGRESQL")]
    PostgreSql,
}

impl DbProvider {
    /// Suffix of the migrations assembly name for this provider
    pub fn migrations_suffix(&self) -> &'static str {
        match self {
            DbProvider::PostgreSql => "PostgreSQL",
        }
    }

    /// Migrations assembly of `module` for this provider: `Catalog.Migrations.PostgreSQL`
    pub fn migrations_assembly(&self, module: &str) -> String {
        format!("{module}.Migrations.{}", self.migrations_suffix())
    }

    /// Comma-separated list of supported identifiers, for error messages
    pub fn supported() -> String {
        DbProvider::iter()
            .map(|provider| provider.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Engine settings produced for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfiguration {
    pub provider: DbProvider,
    pub connection_string: String,
    /// Where this module's migrations live, e.g. `Catalog.Migrations.PostgreSQL`.
    /// Modules may share a physical database but version their schema apart.
    pub migrations_assembly: String,
}

/// Maps a provider identifier to an engine configuration.
pub trait ProviderResolver: Send + Sync {
    /// # Errors
    /// Returns `ModulithError::Configuration` for unsupported providers.
    fn resolve(
        &self,
        provider_id: &str,
        connection_string: &str,
        module: &str,
    ) -> Result<EngineConfiguration>;
}

/// Resolver over [`DbProvider`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProviderResolver;

impl DefaultProviderResolver {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderResolver for DefaultProviderResolver {
    fn resolve(
        &self,
        provider_id: &str,
        connection_string: &str,
        module: &str,
    ) -> Result<EngineConfiguration> {
        let provider = parse_provider(provider_id)?;
        Ok(EngineConfiguration {
            provider,
            connection_string: connection_string.to_string(),
            migrations_assembly: provider.migrations_assembly(module),
        })
    }
}

/// Parse a provider identifier, failing with a configuration error.
pub fn parse_provider(provider_id: &str) -> Result<DbProvider> {
    DbProvider::from_str(provider_id.trim()).map_err(|_| {
        ModulithError::configuration(format!(
            "DB provider `{provider_id}` is not supported (supported: {})",
            DbProvider::supported()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive() {
        let resolver = DefaultProviderResolver::new();
        for id in ["POSTGRESQL", "postgresql", "PostgreSQL", " postgresql "] {
            let config = resolver.resolve(id, "Host=db", "Catalog").unwrap();
            assert_eq!(config.provider, DbProvider::PostgreSql);
            assert_eq!(config.connection_string, "Host=db");
        }
    }

    #[test]
    fn test_resolve_tags_module_migrations() {
        let resolver = DefaultProviderResolver::new();
        let catalog = resolver.resolve("POSTGRESQL", "Host=db", "Catalog").unwrap();
        let ordering = resolver.resolve("POSTGRESQL", "Host=db", "Ordering").unwrap();

        assert_eq!(catalog.migrations_assembly, "Catalog.Migrations.PostgreSQL");
        assert_eq!(ordering.migrations_assembly, "Ordering.Migrations.PostgreSQL");
    }

    #[test]
    fn test_unsupported_provider() {
        let resolver = DefaultProviderResolver::new();
        for id in ["mysql", "", "sqlserver", "postgres"] {
            let err = resolver.resolve(id, "Host=db", "Catalog").unwrap_err();
            assert!(matches!(err, ModulithError::Configuration(_)));
            assert!(err.to_string().contains(&format!("`{id}`")));
        }
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(DbProvider::PostgreSql.to_string(), "POSTGRESQL");
        assert_eq!(DbProvider::supported(), "POSTGRESQL");
    }

    #[test]
    fn test_serde_uses_provider_identifier() {
        assert_eq!(
            serde_json::to_string(&DbProvider::PostgreSql).unwrap(),
            "\"POSTGRESQL\""
        );

        let config: EngineConfiguration = serde_json::from_str(
            r#"{ "provider": "POSTGRESQL", "connection_string": "Host=db", "migrations_assembly": "Catalog.Migrations.PostgreSQL" }"#,
        )
        .unwrap();
        assert_eq!(config.provider, DbProvider::PostgreSql);
        assert_eq!(
            serde_json::to_value(&config).unwrap()["provider"],
            DbProvider::PostgreSql.to_string()
        );
    }
}
