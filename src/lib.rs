//! # modulith-db
//!
//! Persistence provisioning for modular backends: each application module
//! owns a persistence context, and this crate decides at startup how that
//! context is backed and whether its schema needs migrating.
//!
//! ## Features
//!
//! - **Provider selection**: a configured provider id (`POSTGRESQL`) resolves to an
//!   engine configuration tagged with the module's own migrations assembly
//! - **Context binding**: one scoped factory per module context, built lazily from
//!   the loaded [`PersistenceConfig`]
//! - **In-memory mode**: every module gets its own named in-memory store
//! - **Per-module migrations**: pending migrations applied once per module at
//!   bootstrap, failing startup if any module cannot be brought current
//! - **PostgreSQL** (feature `postgres`): `PostgresConnector`, running each
//!   module's embedded diesel migrations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use diesel_migrations::{EmbeddedMigrations, embed_migrations};
//! use modulith_db::persistence::PostgresConnector;
//! use modulith_db::prelude::*;
//!
//! const CATALOG_MIGRATIONS: EmbeddedMigrations = embed_migrations!("modules/catalog/migrations");
//!
//! #[derive(DbContext)]
//! pub struct CatalogDbContext {
//!     database: DatabaseFacade,
//! }
//!
//! pub struct CatalogModule;
//!
//! impl Module for CatalogModule {
//!     fn register(container: &mut Container) -> modulith_db::Result<()> {
//!         ContextBinder::new(container).bind::<CatalogDbContext>()?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = std::fs::read_to_string("appsettings.json")?;
//!     let config = PersistenceConfig::load(Some(&settings), &ConfigService::new())?;
//!
//!     let container = ContainerBuilder::new()
//!         .persistence(config)?
//!         .engine_connector(PostgresConnector::new().with_module_migrations("Catalog", CATALOG_MIGRATIONS))
//!         .import::<CatalogModule>()?
//!         .build();
//!
//!     let app = Application::builder()
//!         .container(container)
//!         .migrate_databases()
//!         .build()
//!         .await?;
//!
//!     // Serve...
//!     Ok(())
//! }
//! ```

// Lets the derive macros refer to `::modulith_db` from inside this crate.
extern crate self as modulith_db;

pub mod config;
pub mod di;
pub mod error;
pub mod lifecycle;
pub mod module;
pub mod persistence;

// Re-export core types
pub use config::{ConfigService, PersistenceConfig};
pub use di::{Container, ContainerBuilder, Scope};
pub use error::{ModulithError, Result};
pub use module::Module;
pub use persistence::{
    ContextBinder, DatabaseFacade, DbContext, MigrationOutcome, MigrationRunner,
    PersistenceContext,
};

// Re-export macros
pub use modulith_db_macro::DbContext;

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;

/// Prelude module for convenient imports
///
/// ```
/// use modulith_db::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigService, PersistenceConfig};
    pub use crate::di::{Container, ContainerBuilder, Scope};
    pub use crate::error::{ModulithError, Result};
    pub use crate::lifecycle::{
        Application, ApplicationBuilder, LifecycleError, LifecycleManager, OnApplicationBootstrap,
        OnModuleInit,
    };
    pub use crate::module::Module;
    // Both the `DbContext` trait and its derive macro
    pub use crate::DbContext;
    pub use crate::persistence::{
        ContextBinder, DatabaseFacade, DatabaseMigrations, DbProvider,
        EngineConfiguration, EngineConnection, EngineConnector, EngineError, InMemoryStore,
        MigrationId, MigrationOutcome, MigrationRunner, PersistenceContext, ProviderResolver,
    };
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
