//! Registration of module persistence contexts

use super::context::{module_label, module_name};
use super::migration::{MigrationFuture, MigrationRunner};
use super::{
    DatabaseFacade, DbContext, DefaultProviderResolver, EngineConnector, InMemoryDatabaseRoot,
    ProviderResolver, parse_provider,
};
use crate::config::PersistenceConfig;
use crate::di::Container;
use crate::error::{ModulithError, Result};
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;

/// Load the persistence configuration into the container.
///
/// Must run before any bound context is resolved. The configuration is
/// read-only once loaded: a second call fails and keeps the first one.
pub fn add_database(container: &mut Container, config: PersistenceConfig) -> Result<()> {
    if container.contains::<PersistenceConfig>() {
        return Err(ModulithError::configuration(
            "persistence configuration is already loaded",
        ));
    }
    if config.use_in_memory_db {
        tracing::info!("using in-memory database");
    } else {
        tracing::info!("current db provider: {}", config.provider);
    }
    container.register(config);
    Ok(())
}

/// A bound context type, as seen by the migration runner.
#[derive(Clone)]
pub struct BoundContext {
    pub type_name: &'static str,
    pub label: String,
    pub(crate) migrate: fn(Arc<Container>) -> MigrationFuture,
}

/// Every context type bound in a container, keyed by type.
///
/// Cloning shares the underlying registry.
#[derive(Clone, Default)]
pub struct ContextRegistry {
    contexts: Arc<DashMap<TypeId, BoundContext>>,
}

impl ContextRegistry {
    pub fn contains<T: DbContext>(&self) -> bool {
        self.contexts.contains_key(&TypeId::of::<T>())
    }

    /// Bound contexts ordered by label
    pub fn bound(&self) -> Vec<BoundContext> {
        let mut bound: Vec<BoundContext> = self.contexts.iter().map(|c| c.value().clone()).collect();
        bound.sort_by(|a, b| a.label.cmp(&b.label));
        bound
    }

    pub fn labels(&self) -> Vec<String> {
        self.bound().into_iter().map(|c| c.label).collect()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    fn find_label(&self, label: &str) -> Option<&'static str> {
        self.contexts
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.type_name)
    }
}

/// Binds module context types into a container.
///
/// # Example
/// ```rust,ignore
/// ContextBinder::new(&mut container)
///     .bind::<CatalogDbContext>()?
///     .bind::<OrderingDbContext>()?;
/// ```
pub struct ContextBinder<'a> {
    container: &'a mut Container,
    registry: ContextRegistry,
}

impl<'a> ContextBinder<'a> {
    /// Prepare `container` for binding, registering the context registry, the
    /// in-memory root and the default provider resolver when absent.
    pub fn new(container: &'a mut Container) -> Self {
        if !container.contains::<InMemoryDatabaseRoot>() {
            container.register(InMemoryDatabaseRoot::new());
        }
        if !container.contains::<dyn ProviderResolver>() {
            container.register_as::<dyn ProviderResolver, _, _>(DefaultProviderResolver::new(), |r| {
                r as Arc<dyn ProviderResolver>
            });
        }
        let registry = match container.resolve::<ContextRegistry>() {
            Ok(registry) => registry.as_ref().clone(),
            Err(_) => {
                let registry = ContextRegistry::default();
                container.register(registry.clone());
                registry
            }
        };
        Self {
            container,
            registry,
        }
    }

    /// Register a scoped factory for `T`.
    ///
    /// Binding the same type again is a no-op. Fails if another bound type
    /// derives the same module label, if the label is empty, or if the loaded
    /// configuration names an unsupported provider.
    pub fn bind<T: DbContext>(&mut self) -> Result<&mut Self> {
        let label = module_label(T::TYPE_NAME);

        if self.registry.contains::<T>() {
            tracing::warn!("{} is already bound; ignoring", T::TYPE_NAME);
            return Ok(self);
        }
        if label.is_empty() {
            return Err(ModulithError::configuration(format!(
                "cannot derive a module label from `{}`",
                T::TYPE_NAME
            )));
        }
        if let Some(other) = self.registry.find_label(&label) {
            return Err(ModulithError::configuration(format!(
                "`{}` and `{other}` both map to module label `{label}`",
                T::TYPE_NAME
            )));
        }
        if let Ok(config) = self.container.resolve::<PersistenceConfig>() {
            if !config.use_in_memory_db {
                parse_provider(&config.provider)?;
            }
        }

        self.container
            .register_scoped::<T, _>(|container| open_database(container, T::TYPE_NAME).map(T::from_database));
        self.registry.contexts.insert(
            TypeId::of::<T>(),
            BoundContext {
                type_name: T::TYPE_NAME,
                label: label.clone(),
                migrate: MigrationRunner::migrate_erased::<T>,
            },
        );

        tracing::debug!("Bound {} as module {}", T::TYPE_NAME, label);
        Ok(self)
    }
}

/// Build the database facade for a context at resolution time.
fn open_database(container: &Container, type_name: &'static str) -> Result<DatabaseFacade> {
    let config = loaded_config(container)?;
    let label = module_label(type_name);

    if config.use_in_memory_db {
        let root = container.resolve::<InMemoryDatabaseRoot>()?;
        let store = root.store(&label);
        return Ok(DatabaseFacade::in_memory(label, store));
    }

    let resolver = container.resolve_trait::<dyn ProviderResolver>()?;
    let engine = resolver.resolve(
        &config.provider_key(),
        &config.connection_string,
        module_name(type_name),
    )?;
    let connector = container
        .resolve_trait::<dyn EngineConnector>()
        .map_err(|_| {
            ModulithError::configuration(format!(
                "no engine connector registered for provider {}",
                engine.provider
            ))
        })?;
    Ok(DatabaseFacade::engine(label, engine, connector))
}

pub(crate) fn loaded_config(container: &Container) -> Result<Arc<PersistenceConfig>> {
    container.resolve::<PersistenceConfig>().map_err(|_| {
        ModulithError::configuration("persistence configuration was not loaded; call add_database first")
    })
}
