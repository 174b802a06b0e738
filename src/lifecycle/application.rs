//! Application startup around a built container

use super::{LifecycleError, LifecycleManager, OnApplicationBootstrap, OnModuleInit, Result};
use crate::di::Container;
use crate::persistence::{DatabaseMigrations, MigrationOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// An application whose startup hooks, including database migrations when
/// enabled, have all completed.
///
/// ```rust,ignore
/// let container = ContainerBuilder::new()
///     .persistence(config)?
///     .engine_connector(PostgresConnector::new().with_module_migrations("Catalog", CATALOG_MIGRATIONS))
///     .import::<CatalogModule>()?
///     .import::<OrderingModule>()?
///     .build();
///
/// let app = Application::builder()
///     .container(container)
///     .migrate_databases()
///     .bootstrap_timeout(Duration::from_secs(60))
///     .build()
///     .await?;
/// ```
pub struct Application {
    container: Arc<Container>,
    hooks: Arc<LifecycleManager>,
    migrations: Option<Arc<RwLock<DatabaseMigrations>>>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn lifecycle_manager(&self) -> &Arc<LifecycleManager> {
        &self.hooks
    }

    /// Per-module migration outcomes from startup.
    ///
    /// Empty unless the builder enabled [`ApplicationBuilder::migrate_databases`].
    pub async fn migration_outcomes(&self) -> Vec<(String, MigrationOutcome)> {
        match &self.migrations {
            Some(migrations) => migrations.read().await.outcomes().to_vec(),
            None => Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct ApplicationBuilder {
    container: Option<Container>,
    hooks: LifecycleManager,
    migrate_databases: bool,
    init_timeout: Option<Duration>,
    bootstrap_timeout: Option<Duration>,
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    /// Bring every bound context's schema up to date during bootstrap
    pub fn migrate_databases(mut self) -> Self {
        self.migrate_databases = true;
        self
    }

    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = Some(timeout);
        self
    }

    /// Deadline for the whole bootstrap phase, migrations included
    pub fn bootstrap_timeout(mut self, timeout: Duration) -> Self {
        self.bootstrap_timeout = Some(timeout);
        self
    }

    pub fn on_init<T>(mut self, service: Arc<RwLock<T>>, name: impl Into<String>) -> Self
    where
        T: OnModuleInit + 'static,
    {
        self.hooks.register_init(service, name);
        self
    }

    pub fn on_bootstrap<T>(mut self, service: Arc<RwLock<T>>, name: impl Into<String>) -> Self
    where
        T: OnApplicationBootstrap + 'static,
    {
        self.hooks.register_bootstrap(service, name);
        self
    }

    /// Run module init hooks, then migrations (if enabled), then the other
    /// bootstrap hooks.
    ///
    /// # Errors
    /// The first hook failure or phase timeout. A failed migration surfaces
    /// as a `HookFailed` error naming `DatabaseMigrations`.
    pub async fn build(self) -> Result<Application> {
        let Self {
            container,
            mut hooks,
            migrate_databases,
            init_timeout,
            bootstrap_timeout,
        } = self;
        let container = Arc::new(container.ok_or_else(|| LifecycleError::startup("no container was provided"))?);

        tracing::info!("Starting application");

        let migrations = migrate_databases.then(|| {
            let migrations = Arc::new(RwLock::new(DatabaseMigrations::new(Arc::clone(&container))));
            hooks.register_bootstrap_first(Arc::clone(&migrations), "DatabaseMigrations");
            migrations
        });

        match init_timeout {
            Some(timeout) => hooks.call_module_init_with_timeout(timeout).await?,
            None => hooks.call_module_init().await?,
        }
        match bootstrap_timeout {
            Some(timeout) => hooks.call_application_bootstrap_with_timeout(timeout).await?,
            None => hooks.call_application_bootstrap().await?,
        }

        tracing::info!("Application started");

        Ok(Application {
            container,
            hooks: Arc::new(hooks),
            migrations,
        })
    }
}
