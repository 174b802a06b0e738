use super::LifecycleError;
use async_trait::async_trait;

/// First startup phase, run once the container holds every module.
#[async_trait]
pub trait OnModuleInit: Send + Sync {
    async fn on_module_init(&mut self) -> Result<(), LifecycleError>;
}

/// Second startup phase. Database migrations run here, ahead of any other
/// bootstrap hook, so an error from any hook keeps the application from
/// serving.
///
/// ```rust,ignore
/// #[async_trait]
/// impl OnApplicationBootstrap for CatalogSeeder {
///     async fn on_application_bootstrap(&mut self) -> Result<(), LifecycleError> {
///         self.seed_categories()
///             .await
///             .map_err(|e| LifecycleError::startup(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait OnApplicationBootstrap: Send + Sync {
    async fn on_application_bootstrap(&mut self) -> Result<(), LifecycleError>;
}
