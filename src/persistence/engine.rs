//! Database engine capability
//!
//! The concrete driver lives outside this crate. It is plugged in through an
//! [`EngineConnector`] registered in the container; the connections it opens
//! only need to report and apply the migrations of their module.

use super::EngineConfiguration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque identifier of one migration artifact, as known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MigrationId(String);

impl MigrationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MigrationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Failures reported by the database engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("migration `{id}` failed: {message}")]
    MigrationFailed { id: MigrationId, message: String },

    #[error("engine error: {0}")]
    Other(String),
}

/// An open connection scoped to one persistence context.
///
/// Dropping the connection closes it.
#[async_trait]
pub trait EngineConnection: Send {
    /// Migrations of this connection's module not yet applied to the database
    async fn pending_migrations(&mut self) -> Result<Vec<MigrationId>, EngineError>;

    /// Apply `pending` in order as a single unit
    async fn apply_migrations(&mut self, pending: &[MigrationId]) -> Result<(), EngineError>;
}

/// Opens engine connections from a resolved configuration.
#[async_trait]
pub trait EngineConnector: Send + Sync {
    async fn connect(
        &self,
        config: &EngineConfiguration,
    ) -> Result<Box<dyn EngineConnection>, EngineError>;
}
