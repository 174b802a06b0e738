//! PostgreSQL engine backed by diesel
//!
//! Each module embeds its own diesel migrations and registers them under its
//! migrations assembly name:
//!
//! ```rust,ignore
//! use diesel_migrations::{EmbeddedMigrations, embed_migrations};
//!
//! const CATALOG_MIGRATIONS: EmbeddedMigrations = embed_migrations!("modules/catalog/migrations");
//!
//! let connector = PostgresConnector::new().with_module_migrations("Catalog", CATALOG_MIGRATIONS);
//! ```
//!
//! Diesel is blocking, so every call runs on tokio's blocking pool. Modules
//! sharing one physical database share diesel's `__diesel_schema_migrations`
//! table; migration versions must therefore be unique across modules.

use super::{DbProvider, EngineConfiguration, EngineConnection, EngineConnector, EngineError, MigrationId};
use async_trait::async_trait;
use diesel::migration::Migration;
use diesel::pg::PgConnection;
use diesel::Connection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};
use std::collections::HashMap;
use std::error::Error;

type MigrationError = Box<dyn Error + Send + Sync>;

/// Opens diesel `PgConnection`s for modules whose migrations were registered.
#[derive(Default)]
pub struct PostgresConnector {
    migrations: HashMap<String, EmbeddedMigrations>,
}

impl PostgresConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the embedded migrations of `module` (`Catalog`, `Ordering`, ...)
    pub fn with_module_migrations(mut self, module: &str, migrations: EmbeddedMigrations) -> Self {
        self.migrations
            .insert(DbProvider::PostgreSql.migrations_assembly(module), migrations);
        self
    }

    pub fn has_migrations_for(&self, migrations_assembly: &str) -> bool {
        self.migrations.contains_key(migrations_assembly)
    }
}

#[async_trait]
impl EngineConnector for PostgresConnector {
    async fn connect(
        &self,
        config: &EngineConfiguration,
    ) -> Result<Box<dyn EngineConnection>, EngineError> {
        let migrations = self
            .migrations
            .get(&config.migrations_assembly)
            .cloned()
            .ok_or_else(|| {
                EngineError::Other(format!(
                    "no embedded migrations registered for {}",
                    config.migrations_assembly
                ))
            })?;

        let conninfo = libpq_conninfo(&config.connection_string);
        let connection = tokio::task::spawn_blocking(move || PgConnection::establish(&conninfo))
            .await
            .map_err(|e| EngineError::Other(format!("connect task failed: {e}")))?
            .map_err(|e| EngineError::Connection(e.to_string()))?;

        tracing::debug!("Connected to PostgreSQL for {}", config.migrations_assembly);
        Ok(Box::new(PgEngineConnection {
            connection: Some(connection),
            migrations,
        }))
    }
}

struct PgEngineConnection {
    // Taken while a blocking call is running
    connection: Option<PgConnection>,
    migrations: EmbeddedMigrations,
}

impl PgEngineConnection {
    async fn blocking<T, F>(&mut self, call: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection, EmbeddedMigrations) -> Result<T, EngineError> + Send + 'static,
    {
        let mut connection = self
            .connection
            .take()
            .ok_or_else(|| EngineError::Connection("connection was lost by an earlier call".into()))?;
        let migrations = self.migrations.clone();

        let (connection, result) = tokio::task::spawn_blocking(move || {
            let result = call(&mut connection, migrations);
            (connection, result)
        })
        .await
        .map_err(|e| EngineError::Other(format!("blocking task failed: {e}")))?;

        self.connection = Some(connection);
        result
    }
}

#[async_trait]
impl EngineConnection for PgEngineConnection {
    async fn pending_migrations(&mut self) -> Result<Vec<MigrationId>, EngineError> {
        self.blocking(|connection, migrations| {
            let pending = connection
                .pending_migrations(migrations)
                .map_err(|e| EngineError::Other(e.to_string()))?;
            Ok(pending
                .iter()
                .map(|migration| MigrationId::new(migration.name().to_string()))
                .collect())
        })
        .await
    }

    async fn apply_migrations(&mut self, pending: &[MigrationId]) -> Result<(), EngineError> {
        let Some(first) = pending.first().cloned() else {
            return Ok(());
        };
        self.blocking(move |connection, migrations| {
            connection
                .transaction::<_, MigrationError, _>(|connection| {
                    connection.run_pending_migrations(migrations)?;
                    Ok(())
                })
                .map_err(|e| EngineError::MigrationFailed {
                    id: first,
                    message: e.to_string(),
                })
        })
        .await
    }
}

/// Accept Npgsql-style `Key=Value;` connection strings as well as URLs.
///
/// Keys libpq has no equivalent for are dropped.
fn libpq_conninfo(connection_string: &str) -> String {
    if connection_string.contains("://") {
        return connection_string.to_string();
    }

    connection_string
        .split(';')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim().to_ascii_lowercase();
            let keyword = match key.as_str() {
                "host" | "server" => "host",
                "port" => "port",
                "database" | "db" => "dbname",
                "username" | "user" | "user id" | "userid" => "user",
                "password" | "pwd" => "password",
                "ssl mode" | "sslmode" => "sslmode",
                "timeout" => "connect_timeout",
                "application name" => "application_name",
                _ => {
                    tracing::debug!("Ignoring connection string key `{}`", key);
                    return None;
                }
            };
            let value = match keyword {
                "sslmode" => value.trim().to_ascii_lowercase(),
                _ => value.trim().to_string(),
            };
            Some(format!(
                "{keyword}='{}'",
                value.replace('\\', "\\\\").replace('\'', "\\'")
            ))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npgsql_keys_map_to_libpq() {
        assert_eq!(
            libpq_conninfo("Host=db;Port=5432;Database=shop;Username=app;Password=s3cret;SSL Mode=Require"),
            "host='db' port='5432' dbname='shop' user='app' password='s3cret' sslmode='require'"
        );
    }

    #[test]
    fn test_conninfo_quoting_and_unknown_keys() {
        assert_eq!(
            libpq_conninfo("Server=db; Password=it's;Pooling=true;"),
            r"host='db' password='it\'s'"
        );
        assert_eq!(
            libpq_conninfo("postgres://app@db/shop"),
            "postgres://app@db/shop"
        );
    }

    #[tokio::test]
    async fn test_connect_requires_registered_migrations() {
        let connector = PostgresConnector::new();
        let config = EngineConfiguration {
            provider: DbProvider::PostgreSql,
            connection_string: "Host=localhost".into(),
            migrations_assembly: DbProvider::PostgreSql.migrations_assembly("Catalog"),
        };

        let err = connector.connect(&config).await.err().unwrap();
        assert!(err.to_string().contains("Catalog.Migrations.PostgreSQL"));
        assert!(!connector.has_migrations_for("Catalog.Migrations.PostgreSQL"));
    }
}
