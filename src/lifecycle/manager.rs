//! Ordered execution of startup hooks

use super::{LifecycleError, OnApplicationBootstrap, OnModuleInit, Phase, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

struct NamedHook<T: ?Sized> {
    name: String,
    service: Arc<RwLock<T>>,
}

fn init_hook<'a>(service: &'a mut (dyn OnModuleInit + 'static)) -> HookFuture<'a> {
    service.on_module_init()
}

fn bootstrap_hook<'a>(service: &'a mut (dyn OnApplicationBootstrap + 'static)) -> HookFuture<'a> {
    service.on_application_bootstrap()
}

/// Startup hooks, per phase, in the order they run.
///
/// The first failing hook ends its phase; later hooks are not called.
///
/// ```rust,ignore
/// let mut manager = LifecycleManager::new();
/// manager.register_bootstrap(Arc::new(RwLock::new(seeder)), "CatalogSeeder");
/// manager.register_bootstrap_first(migrations, "DatabaseMigrations");
///
/// manager.call_module_init().await?;
/// manager.call_application_bootstrap().await?;
/// ```
#[derive(Default)]
pub struct LifecycleManager {
    init: Vec<NamedHook<dyn OnModuleInit>>,
    bootstrap: Vec<NamedHook<dyn OnApplicationBootstrap>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_init<T>(&mut self, service: Arc<RwLock<T>>, name: impl Into<String>)
    where
        T: OnModuleInit + 'static,
    {
        self.init.push(NamedHook {
            name: name.into(),
            service,
        });
    }

    pub fn register_bootstrap<T>(&mut self, service: Arc<RwLock<T>>, name: impl Into<String>)
    where
        T: OnApplicationBootstrap + 'static,
    {
        self.bootstrap.push(NamedHook {
            name: name.into(),
            service,
        });
    }

    /// Register a bootstrap hook that runs before every other one
    pub fn register_bootstrap_first<T>(&mut self, service: Arc<RwLock<T>>, name: impl Into<String>)
    where
        T: OnApplicationBootstrap + 'static,
    {
        self.bootstrap.insert(
            0,
            NamedHook {
                name: name.into(),
                service,
            },
        );
    }

    pub async fn call_module_init(&self) -> Result<()> {
        run_phase(Phase::ModuleInit, &self.init, init_hook).await
    }

    pub async fn call_module_init_with_timeout(&self, timeout: Duration) -> Result<()> {
        with_deadline(Phase::ModuleInit, timeout, self.call_module_init()).await
    }

    pub async fn call_application_bootstrap(&self) -> Result<()> {
        run_phase(Phase::ApplicationBootstrap, &self.bootstrap, bootstrap_hook).await
    }

    /// Bootstrap with a deadline for the whole phase.
    ///
    /// A migration already started when the deadline passes is not rolled
    /// back here.
    pub async fn call_application_bootstrap_with_timeout(&self, timeout: Duration) -> Result<()> {
        with_deadline(
            Phase::ApplicationBootstrap,
            timeout,
            self.call_application_bootstrap(),
        )
        .await
    }

    pub fn init_hook_count(&self) -> usize {
        self.init.len()
    }

    pub fn bootstrap_hook_count(&self) -> usize {
        self.bootstrap.len()
    }
}

async fn run_phase<T: ?Sized>(
    phase: Phase,
    hooks: &[NamedHook<T>],
    call: for<'a> fn(&'a mut T) -> HookFuture<'a>,
) -> Result<()> {
    tracing::info!("Running {} hooks ({})", phase, hooks.len());

    for hook in hooks {
        let started = Instant::now();
        let mut service = hook.service.write().await;
        call(&mut *service).await.map_err(|e| {
            tracing::error!("{} hook {} failed: {}", phase, hook.name, e);
            LifecycleError::hook_failed(phase, &hook.name, e.to_string())
        })?;
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{} hook {} finished",
            phase,
            hook.name
        );
    }

    Ok(())
}

async fn with_deadline(
    phase: Phase,
    timeout: Duration,
    run: impl Future<Output = Result<()>>,
) -> Result<()> {
    tokio::time::timeout(timeout, run)
        .await
        .map_err(|_| LifecycleError::timeout(phase, timeout))?
}
