use crate::di::Container;
use crate::error::{ModulithError, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// A unit of work over a [`Container`].
///
/// Scoped services are created on first resolution and cached for the life
/// of the scope. Dropping the scope drops every instance it created, which is
/// how persistence contexts release their connections.
///
/// # Example
/// ```rust,ignore
/// let mut scope = Scope::new(&container);
/// let context = scope.resolve::<CatalogDbContext>()?;
/// // ... use the context ...
/// drop(scope); // connection closed here
/// ```
pub struct Scope<'a> {
    container: &'a Container,
    instances: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl<'a> Scope<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            container,
            instances: HashMap::new(),
        }
    }

    /// The container this scope resolves from
    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// Resolve a scoped service, creating it on first use within this scope.
    pub fn resolve<T: 'static + Send>(&mut self) -> Result<&mut T> {
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();

        if !self.instances.contains_key(&type_id) {
            let instance = self.container.create_scoped(type_id, type_name)?;
            self.instances.insert(type_id, instance);
        }

        self.instances
            .get_mut(&type_id)
            .and_then(|instance| (**instance).downcast_mut::<T>())
            .ok_or_else(|| ModulithError::DowncastFailed {
                type_name: type_name.to_string(),
            })
    }

    /// Number of instances created so far in this scope
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if !self.instances.is_empty() {
            tracing::trace!("Disposing scope ({} instances)", self.instances.len());
        }
    }
}
