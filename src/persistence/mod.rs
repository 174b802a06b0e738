//! Multi-module persistence provisioning
//!
//! Each application module owns a context type (`CatalogDbContext`,
//! `OrderingDbContext`, ...). At startup:
//!
//! ```text
//! 1. add_database         load PersistenceConfig into the container
//!    ↓
//! 2. ContextBinder::bind  one scoped factory per module context
//!    ↓
//! 3. MigrationRunner      per module: skip (in-memory), no-op (current)
//!                         or apply pending migrations
//! ```
//!
//! Per module the states are:
//!
//! ```text
//! Unbound → Bound → InMemoryReady
//!                 → SchemaChecked → SchemaCurrent | SchemaMigrated
//!                                 → MigrationFailed (startup aborts)
//! ```

mod binder;
mod context;
mod engine;
mod memory;
mod migration;
#[cfg(feature = "postgres")]
mod postgres;
mod provider;

pub use binder::{BoundContext, ContextBinder, ContextRegistry, add_database};
pub use context::{
    CONTEXT_SUFFIX, DatabaseFacade, DbContext, PersistenceContext, module_label, module_name,
};
pub use engine::{EngineConnection, EngineConnector, EngineError, MigrationId};
pub use memory::{InMemoryDatabaseRoot, InMemoryStore};
pub use migration::{DatabaseMigrations, MigrationOutcome, MigrationRunner, migrate_context};
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnector;
pub use provider::{
    DbProvider, DefaultProviderResolver, EngineConfiguration, ProviderResolver, parse_provider,
};

#[cfg(test)]
pub(crate) mod fakes;
