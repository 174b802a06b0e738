//! In-process stand-ins for the engine driver and resolver, for unit tests.

use super::{
    DatabaseFacade, DbContext, DefaultProviderResolver, EngineConfiguration, EngineConnection,
    EngineConnector, EngineError, MigrationId, ProviderResolver,
};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(crate::DbContext)]
pub struct CatalogDbContext {
    database: DatabaseFacade,
}

#[derive(crate::DbContext)]
pub struct OrderingDbContext {
    database: DatabaseFacade,
}

/// Distinct type whose label collides with `CatalogDbContext`.
pub struct LegacyCatalogContext {
    database: DatabaseFacade,
}

impl DbContext for LegacyCatalogContext {
    const TYPE_NAME: &'static str = "CatalogDBCONTEXT";

    fn from_database(database: DatabaseFacade) -> Self {
        Self { database }
    }

    fn database(&self) -> &DatabaseFacade {
        &self.database
    }

    fn database_mut(&mut self) -> &mut DatabaseFacade {
        &mut self.database
    }
}

#[derive(Default)]
pub struct EngineState {
    pending: Mutex<HashMap<String, Vec<MigrationId>>>,
    applied: Mutex<HashMap<String, Vec<MigrationId>>>,
    fail_apply: AtomicBool,
    panic_pending: Mutex<Option<String>>,
    apply_delay: Mutex<Option<Duration>>,
    pub connects: AtomicUsize,
    pub open: AtomicUsize,
    pub queries: AtomicUsize,
    pub applies: AtomicUsize,
}

/// Engine keeping migration state per migrations assembly.
#[derive(Clone, Default)]
pub struct FakeEngine {
    pub state: Arc<EngineState>,
}

impl FakeEngine {
    pub fn with_pending(self, assembly: &str, ids: &[&str]) -> Self {
        self.state.pending.lock().unwrap().insert(
            assembly.to_string(),
            ids.iter().map(|id| MigrationId::new(*id)).collect(),
        );
        self
    }

    pub fn failing_apply(self) -> Self {
        self.state.fail_apply.store(true, Ordering::SeqCst);
        self
    }

    /// Panic, as a buggy driver would, when `assembly` is queried
    pub fn panicking_on(self, assembly: &str) -> Self {
        *self.state.panic_pending.lock().unwrap() = Some(assembly.to_string());
        self
    }

    pub fn slow_apply(self, delay: Duration) -> Self {
        *self.state.apply_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn applied(&self, assembly: &str) -> Vec<MigrationId> {
        self.state
            .applied
            .lock()
            .unwrap()
            .get(assembly)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct FakeConnection {
    assembly: String,
    state: Arc<EngineState>,
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.state.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EngineConnection for FakeConnection {
    async fn pending_migrations(&mut self) -> std::result::Result<Vec<MigrationId>, EngineError> {
        self.state.queries.fetch_add(1, Ordering::SeqCst);
        if self.state.panic_pending.lock().unwrap().as_deref() == Some(self.assembly.as_str()) {
            panic!("driver bug while reading {}", self.assembly);
        }
        Ok(self
            .state
            .pending
            .lock()
            .unwrap()
            .get(&self.assembly)
            .cloned()
            .unwrap_or_default())
    }

    async fn apply_migrations(&mut self, pending: &[MigrationId]) -> std::result::Result<(), EngineError> {
        self.state.applies.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.apply_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail_apply.load(Ordering::SeqCst) {
            return Err(EngineError::MigrationFailed {
                id: pending[0].clone(),
                message: "relation \"products\" already exists".into(),
            });
        }
        self.state.pending.lock().unwrap().remove(&self.assembly);
        self.state
            .applied
            .lock()
            .unwrap()
            .entry(self.assembly.clone())
            .or_default()
            .extend_from_slice(pending);
        Ok(())
    }
}

#[async_trait]
impl EngineConnector for FakeEngine {
    async fn connect(
        &self,
        config: &EngineConfiguration,
    ) -> std::result::Result<Box<dyn EngineConnection>, EngineError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            assembly: config.migrations_assembly.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// Resolver recording every call before delegating to the default one.
#[derive(Default)]
pub struct CountingResolver {
    pub calls: Mutex<Vec<(String, String, String)>>,
}

impl CountingResolver {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ProviderResolver for CountingResolver {
    fn resolve(
        &self,
        provider_id: &str,
        connection_string: &str,
        module: &str,
    ) -> Result<EngineConfiguration> {
        self.calls.lock().unwrap().push((
            provider_id.to_string(),
            connection_string.to_string(),
            module.to_string(),
        ));
        DefaultProviderResolver::new().resolve(provider_id, connection_string, module)
    }
}
