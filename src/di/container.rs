use crate::error::{ModulithError, Result};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

type Instance = Arc<dyn Any + Send + Sync>;

/// Turns a registered `Arc<Impl>` into an `Arc<dyn Trait>`, itself boxed as
/// `dyn Any` so that bindings of different traits share one map.
type CasterFn = Arc<dyn Fn(Instance) -> Option<Instance> + Send + Sync>;

/// Factory producing a fresh scoped instance, boxed as `dyn Any`.
pub(crate) type ScopedFactory =
    Arc<dyn Fn(&Container) -> Result<Box<dyn Any + Send>> + Send + Sync>;

#[derive(Clone)]
struct TraitBinding {
    impl_id: TypeId,
    caster: CasterFn,
}

/// Thread-safe dependency injection container.
///
/// Holds three kinds of registrations:
/// - singletons, shared as `Arc<T>`
/// - trait bindings, resolving `Arc<dyn Trait>` to a registered singleton
/// - scoped factories, invoked once per [`Scope`](crate::di::Scope)
#[derive(Clone, Default)]
pub struct Container {
    singletons: DashMap<TypeId, Instance>,
    bindings: DashMap<TypeId, TraitBinding>,
    scoped: DashMap<TypeId, ScopedFactory>,
}

fn not_found<T: ?Sized>(detail: &str) -> ModulithError {
    ModulithError::DependencyNotFound {
        type_name: format!("{}{detail}", std::any::type_name::<T>()),
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a singleton, replacing any earlier instance of `T`
    pub fn register<T: 'static + Send + Sync>(&mut self, instance: T) -> &mut Self {
        self.singletons.insert(TypeId::of::<T>(), Arc::new(instance));
        self
    }

    /// Resolve `Arc<Trait>` to the singleton registered as `Impl`
    pub fn register_trait<Trait, Impl, F>(&mut self, caster_fn: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        Impl: 'static + Send + Sync,
        F: Fn(Arc<Impl>) -> Arc<Trait> + 'static + Send + Sync,
    {
        let caster: CasterFn = Arc::new(move |instance: Instance| {
            let concrete = instance.downcast::<Impl>().ok()?;
            let trait_obj: Arc<Trait> = caster_fn(concrete);
            Some(Arc::new(trait_obj) as Instance)
        });
        self.bindings.insert(
            TypeId::of::<Trait>(),
            TraitBinding {
                impl_id: TypeId::of::<Impl>(),
                caster,
            },
        );
        self
    }

    /// Register an instance together with a trait binding for it.
    pub fn register_as<Trait, Impl, F>(&mut self, instance: Impl, caster_fn: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        Impl: 'static + Send + Sync,
        F: Fn(Arc<Impl>) -> Arc<Trait> + 'static + Send + Sync,
    {
        self.register(instance);
        self.register_trait::<Trait, Impl, F>(caster_fn)
    }

    /// Register a factory for a scoped service.
    ///
    /// The factory is not invoked here; it runs the first time `T` is
    /// resolved inside a [`Scope`](crate::di::Scope), and the instance lives
    /// until that scope is dropped.
    pub fn register_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send,
        F: Fn(&Container) -> Result<T> + 'static + Send + Sync,
    {
        let factory: ScopedFactory = Arc::new(move |container: &Container| {
            factory(container).map(|instance| Box::new(instance) as Box<dyn Any + Send>)
        });
        self.scoped.insert(TypeId::of::<T>(), factory);
        self
    }

    pub fn resolve<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        let type_id = TypeId::of::<T>();
        let Some(instance) = self.singletons.get(&type_id).map(|i| Arc::clone(i.value())) else {
            if self.scoped.contains_key(&type_id) {
                return Err(ModulithError::ScopeMismatch {
                    message: format!(
                        "'{}' is scoped and must be resolved from a Scope",
                        std::any::type_name::<T>()
                    ),
                });
            }
            return Err(not_found::<T>(""));
        };
        instance
            .downcast::<T>()
            .map_err(|_| ModulithError::DowncastFailed {
                type_name: std::any::type_name::<T>().to_string(),
            })
    }

    pub fn resolve_trait<T: ?Sized + 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        let binding = self
            .bindings
            .get(&TypeId::of::<T>())
            .map(|b| b.value().clone())
            .ok_or_else(|| not_found::<T>(" (no binding)"))?;
        let instance = self
            .singletons
            .get(&binding.impl_id)
            .map(|i| Arc::clone(i.value()))
            .ok_or_else(|| not_found::<T>(" (implementation not registered)"))?;

        let downcast_failed = || ModulithError::DowncastFailed {
            type_name: format!("Arc<{}>", std::any::type_name::<T>()),
        };
        let wrapper = (binding.caster)(instance)
            .ok_or_else(downcast_failed)?
            .downcast::<Arc<T>>()
            .map_err(|_| downcast_failed())?;
        Ok(wrapper.as_ref().clone())
    }

    /// Run the scoped factory for `T`. Callers go through `Scope`.
    pub(crate) fn create_scoped(&self, type_id: TypeId, type_name: &str) -> Result<Box<dyn Any + Send>> {
        let factory = self
            .scoped
            .get(&type_id)
            .map(|factory| Arc::clone(factory.value()))
            .ok_or_else(|| ModulithError::DependencyNotFound {
                type_name: type_name.to_string(),
            })?;
        factory(self)
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let type_id = TypeId::of::<T>();
        self.singletons.contains_key(&type_id)
            || self.bindings.contains_key(&type_id)
            || self.scoped.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.singletons.len() + self.scoped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty() && self.scoped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConnectionString {
        value: &'static str,
    }

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    struct FixedClock {
        at: u64,
    }

    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            self.at
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut container = Container::new();
        container.register(ConnectionString { value: "Host=db" });
        let service = container.resolve::<ConnectionString>().unwrap();
        assert_eq!(service.value, "Host=db");
    }

    #[test]
    fn test_register_and_resolve_trait() {
        let mut container = Container::new();
        container.register_as::<dyn Clock, _, _>(FixedClock { at: 99 }, |c| c as Arc<dyn Clock>);
        let clock = container.resolve_trait::<dyn Clock>().unwrap();
        assert_eq!(clock.now(), 99);
        assert!(container.contains::<dyn Clock>());
    }

    #[test]
    fn test_resolve_missing_service() {
        let container = Container::new();
        let err = container.resolve::<ConnectionString>().err().unwrap();
        assert!(matches!(err, ModulithError::DependencyNotFound { .. }));
    }

    #[test]
    fn test_scoped_service_is_not_a_singleton() {
        let mut container = Container::new();
        container.register_scoped::<u32, _>(|_| Ok(7));
        assert!(container.contains::<u32>());

        let err = container.resolve::<u32>().err().unwrap();
        assert!(matches!(err, ModulithError::ScopeMismatch { .. }));
    }
}
