use crate::di::Container;
use crate::error::Result;

/// Trait for application modules
///
/// A module registers its own providers and binds its persistence context,
/// so its schema is versioned and migrated independently of other modules.
///
/// # Example
/// ```rust,ignore
/// use modulith_db::{Container, Module, Result};
/// use modulith_db::persistence::ContextBinder;
///
/// pub struct CatalogModule;
///
/// impl Module for CatalogModule {
///     fn register(container: &mut Container) -> Result<()> {
///         ContextBinder::new(container).bind::<CatalogDbContext>()?;
///         Ok(())
///     }
/// }
/// ```
pub trait Module {
    /// Register all providers and the persistence context of this module
    fn register(container: &mut Container) -> Result<()>;
}
