//! Persistence contexts and module naming

use super::{EngineConfiguration, EngineConnection, EngineConnector, EngineError, InMemoryStore, MigrationId};
use async_trait::async_trait;
use std::sync::Arc;

/// Suffix stripped from context type names to obtain the module name
pub const CONTEXT_SUFFIX: &str = "DbContext";

/// Module name of a context type: `CatalogDbContext` -> `Catalog`.
///
/// Any leading module path is ignored and the `DbContext` suffix is matched
/// case-insensitively. Names without the suffix are returned unchanged.
pub fn module_name(type_name: &str) -> &str {
    let name = type_name.rsplit("::").next().unwrap_or(type_name);
    match name.len().checked_sub(CONTEXT_SUFFIX.len()) {
        Some(cut)
            if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(CONTEXT_SUFFIX) =>
        {
            &name[..cut]
        }
        _ => name,
    }
}

/// Module label of a context type: `CatalogDbContext` -> `CATALOG`.
///
/// Names the in-memory store and appears in migration log records.
pub fn module_label(type_name: &str) -> String {
    module_name(type_name).to_uppercase()
}

enum Backend {
    InMemory(Arc<InMemoryStore>),
    Engine {
        config: EngineConfiguration,
        connector: Arc<dyn EngineConnector>,
        connection: Option<Box<dyn EngineConnection>>,
    },
}

/// Database handle owned by a module's context.
///
/// Either backed by a named in-memory store, or by an engine connection that
/// is opened on first use and closed when the facade is dropped.
pub struct DatabaseFacade {
    label: String,
    backend: Backend,
}

impl DatabaseFacade {
    pub fn in_memory(label: impl Into<String>, store: Arc<InMemoryStore>) -> Self {
        Self {
            label: label.into(),
            backend: Backend::InMemory(store),
        }
    }

    pub fn engine(
        label: impl Into<String>,
        config: EngineConfiguration,
        connector: Arc<dyn EngineConnector>,
    ) -> Self {
        Self {
            label: label.into(),
            backend: Backend::Engine {
                config,
                connector,
                connection: None,
            },
        }
    }

    /// Module label this database belongs to
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.backend, Backend::InMemory(_))
    }

    pub fn store(&self) -> Option<&Arc<InMemoryStore>> {
        match &self.backend {
            Backend::InMemory(store) => Some(store),
            Backend::Engine { .. } => None,
        }
    }

    pub fn engine_configuration(&self) -> Option<&EngineConfiguration> {
        match &self.backend {
            Backend::InMemory(_) => None,
            Backend::Engine { config, .. } => Some(config),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.backend,
            Backend::Engine {
                connection: Some(_),
                ..
            }
        )
    }

    async fn connection(&mut self) -> Result<&mut (dyn EngineConnection + 'static), EngineError> {
        match &mut self.backend {
            Backend::InMemory(_) => Err(EngineError::Other(format!(
                "{} uses an in-memory store and has no engine connection",
                self.label
            ))),
            Backend::Engine {
                config,
                connector,
                connection,
            } => {
                if connection.is_none() {
                    tracing::debug!(
                        "Opening {} connection for {}",
                        config.provider,
                        config.migrations_assembly
                    );
                    *connection = Some(connector.connect(config).await?);
                }
                connection
                    .as_deref_mut()
                    .ok_or_else(|| EngineError::Connection("connection was not opened".into()))
            }
        }
    }

    /// Migrations not yet applied. Always empty for in-memory stores.
    pub async fn pending_migrations(&mut self) -> Result<Vec<MigrationId>, EngineError> {
        if self.is_in_memory() {
            return Ok(Vec::new());
        }
        self.connection().await?.pending_migrations().await
    }

    /// Apply `pending` as one unit.
    pub async fn apply_migrations(&mut self, pending: &[MigrationId]) -> Result<(), EngineError> {
        if pending.is_empty() {
            return Ok(());
        }
        self.connection().await?.apply_migrations(pending).await
    }

    /// Apply every pending migration, returning what was applied.
    pub async fn migrate(&mut self) -> Result<Vec<MigrationId>, EngineError> {
        let pending = self.pending_migrations().await?;
        self.apply_migrations(&pending).await?;
        Ok(pending)
    }
}

/// A module's persistence context type.
///
/// Usually derived:
///
/// ```rust,ignore
/// use modulith_db::DbContext;
/// use modulith_db::persistence::DatabaseFacade;
///
/// #[derive(DbContext)]
/// pub struct CatalogDbContext {
///     database: DatabaseFacade,
/// }
/// ```
pub trait DbContext: Send + Sized + 'static {
    /// Type name the module label is derived from
    const TYPE_NAME: &'static str;

    fn from_database(database: DatabaseFacade) -> Self;

    fn database(&self) -> &DatabaseFacade;

    fn database_mut(&mut self) -> &mut DatabaseFacade;

    fn module_label() -> String {
        module_label(Self::TYPE_NAME)
    }
}

/// Object-safe view of a context, used by the migration runner.
#[async_trait]
pub trait PersistenceContext: Send {
    fn type_label(&self) -> &str;

    async fn pending_migrations(&mut self) -> Result<Vec<MigrationId>, EngineError>;

    async fn apply_migrations(&mut self, pending: &[MigrationId]) -> Result<(), EngineError>;

    async fn has_pending_migrations(&mut self) -> Result<bool, EngineError> {
        Ok(!self.pending_migrations().await?.is_empty())
    }
}

#[async_trait]
impl<T: DbContext> PersistenceContext for T {
    fn type_label(&self) -> &str {
        self.database().label()
    }

    async fn pending_migrations(&mut self) -> Result<Vec<MigrationId>, EngineError> {
        self.database_mut().pending_migrations().await
    }

    async fn apply_migrations(&mut self, pending: &[MigrationId]) -> Result<(), EngineError> {
        self.database_mut().apply_migrations(pending).await
    }
}
