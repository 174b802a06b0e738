//! Applying pending migrations per module
//!
//! Each bound context is migrated from its own [`Scope`], so concurrent runs
//! for different modules never share a connection. There is no cross-process
//! lock: two processes migrating the same module at once rely on whatever
//! locking the database engine applies.

use super::binder::{ContextRegistry, loaded_config};
use super::{DbContext, EngineError, MigrationId, PersistenceContext};
use crate::di::{Container, Scope};
use crate::error::{ModulithError, Result};
use crate::lifecycle::{LifecycleError, OnApplicationBootstrap};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Boxed migration of one bound context type.
pub(crate) type MigrationFuture = Pin<Box<dyn Future<Output = Result<MigrationOutcome>> + Send>>;

/// Terminal state of one migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// In-memory store; migration state was not inspected
    InMemory,
    /// Nothing pending
    Current,
    /// Pending migrations were applied as one unit
    Migrated {
        applied: Vec<MigrationId>,
        applied_at: DateTime<Utc>,
    },
}

impl MigrationOutcome {
    pub fn applied(&self) -> &[MigrationId] {
        match self {
            MigrationOutcome::Migrated { applied, .. } => applied,
            _ => &[],
        }
    }
}

/// Brings bound contexts' schemas up to date.
#[derive(Clone)]
pub struct MigrationRunner {
    container: Arc<Container>,
}

impl MigrationRunner {
    pub fn new(container: Arc<Container>) -> Self {
        Self { container }
    }

    /// Apply pending migrations for `T`.
    ///
    /// Safe to call repeatedly: once the schema is current, later calls
    /// return [`MigrationOutcome::Current`] without applying anything.
    ///
    /// # Errors
    /// `ModulithError::Configuration` if the config is missing or the context
    /// cannot be built; `ModulithError::Migration` if the engine fails.
    pub async fn ensure_migrated<T: DbContext>(&self) -> Result<MigrationOutcome> {
        let config = loaded_config(&self.container)?;
        if config.use_in_memory_db {
            tracing::debug!("Skipping migrations for {} (in-memory)", T::module_label());
            return Ok(MigrationOutcome::InMemory);
        }

        // The scope, and with it the context's connection, is dropped on
        // every return path below.
        let mut scope = Scope::new(&self.container);
        let context = scope.resolve::<T>()?;
        migrate_context(context).await
    }

    /// Migrate every bound context concurrently, one task and scope each.
    ///
    /// All runs are awaited before returning, so a failing (or panicking)
    /// module does not interrupt another module's migration midway. The
    /// first failure by module label is returned.
    pub async fn ensure_all_migrated(&self) -> Result<Vec<(String, MigrationOutcome)>> {
        let Ok(registry) = self.container.resolve::<ContextRegistry>() else {
            return Ok(Vec::new());
        };

        let mut tasks = JoinSet::new();
        let mut labels = HashMap::new();
        for bound in registry.bound() {
            let container = Arc::clone(&self.container);
            let handle = tasks.spawn((bound.migrate)(container));
            labels.insert(handle.id(), bound.label);
        }

        let mut results = Vec::with_capacity(labels.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            let entry = match joined {
                Ok((id, result)) => (labels.remove(&id).unwrap_or_default(), result),
                Err(e) => {
                    let label = labels.remove(&e.id()).unwrap_or_default();
                    tracing::error!("Migration task for {} module panicked: {}", label, e);
                    let source = EngineError::Other(format!("migration task panicked: {e}"));
                    let err = ModulithError::migration(&label, source);
                    (label, Err(err))
                }
            };
            results.push(entry);
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));

        results
            .into_iter()
            .map(|(label, result)| result.map(|outcome| (label, outcome)))
            .collect()
    }

    pub(crate) fn migrate_erased<T: DbContext>(container: Arc<Container>) -> MigrationFuture {
        Box::pin(async move { MigrationRunner::new(container).ensure_migrated::<T>().await })
    }
}

/// Apply whatever `context` reports as pending.
pub async fn migrate_context(context: &mut dyn PersistenceContext) -> Result<MigrationOutcome> {
    let label = context.type_label().to_string();

    let pending = context
        .pending_migrations()
        .await
        .map_err(|e| ModulithError::migration(&label, e))?;
    if pending.is_empty() {
        tracing::debug!("Database schema for {} module is current", label);
        return Ok(MigrationOutcome::Current);
    }

    context.apply_migrations(&pending).await.map_err(|e| {
        tracing::error!("Migrating {} module failed: {}", label, e);
        ModulithError::migration(&label, e)
    })?;
    tracing::info!(
        module = %label,
        count = pending.len(),
        "applied database migrations for {} module",
        label
    );

    Ok(MigrationOutcome::Migrated {
        applied: pending,
        applied_at: Utc::now(),
    })
}

/// Runs [`MigrationRunner::ensure_all_migrated`] as a bootstrap hook, so the
/// application fails to start while any module's schema is stale.
pub struct DatabaseMigrations {
    runner: MigrationRunner,
    outcomes: Vec<(String, MigrationOutcome)>,
}

impl DatabaseMigrations {
    pub fn new(container: Arc<Container>) -> Self {
        Self {
            runner: MigrationRunner::new(container),
            outcomes: Vec::new(),
        }
    }

    /// Outcomes of the last run, by module label
    pub fn outcomes(&self) -> &[(String, MigrationOutcome)] {
        &self.outcomes
    }
}

#[async_trait]
impl OnApplicationBootstrap for DatabaseMigrations {
    async fn on_application_bootstrap(&mut self) -> std::result::Result<(), LifecycleError> {
        self.outcomes = self
            .runner
            .ensure_all_migrated()
            .await
            .map_err(|e| LifecycleError::startup(e.to_string()))?;
        Ok(())
    }
}
