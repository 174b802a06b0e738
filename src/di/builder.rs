use crate::config::PersistenceConfig;
use crate::di::Container;
use crate::error::Result;
use crate::module::Module;
use crate::persistence::{self, EngineConnector};
use std::sync::Arc;

/// Builder for constructing a dependency injection container
///
/// Use this to configure and register services before building the final container.
///
/// # Example
/// ```rust,ignore
/// let container = ContainerBuilder::new()
///     .persistence(PersistenceConfig::load(Some(&settings), &ConfigService::new())?)?
///     .engine_connector(PostgresConnector::new().with_module_migrations("Catalog", CATALOG_MIGRATIONS))
///     .import::<CatalogModule>()?
///     .build();
/// ```
pub struct ContainerBuilder {
    container: Container,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            container: Container::new(),
        }
    }

    /// Register a service instance
    pub fn register<T: 'static + Send + Sync>(mut self, instance: T) -> Self {
        self.container.register(instance);
        self
    }

    /// Bind a trait to a concrete implementation
    ///
    /// This enables resolving `Arc<dyn Trait>` to the registered implementation.
    /// The implementation must have been registered first (or will be).
    pub fn bind<Trait, Impl, F>(mut self, caster: F) -> Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        Impl: 'static + Send + Sync,
        F: Fn(Arc<Impl>) -> Arc<Trait> + 'static + Send + Sync,
    {
        self.container.register_trait::<Trait, Impl, F>(caster);
        self
    }

    /// Load the persistence configuration into the container
    pub fn persistence(mut self, config: PersistenceConfig) -> Result<Self> {
        persistence::add_database(&mut self.container, config)?;
        Ok(self)
    }

    /// Register the driver used to open engine connections
    pub fn engine_connector<C: EngineConnector + 'static>(mut self, connector: C) -> Self {
        self.container
            .register_as::<dyn EngineConnector, C, _>(connector, |c| c as Arc<dyn EngineConnector>);
        self
    }

    /// Register a module's providers and persistence context
    pub fn import<M: Module>(mut self) -> Result<Self> {
        M::register(&mut self.container)?;
        Ok(self)
    }

    /// Build the container
    pub fn build(self) -> Container {
        self.container
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
