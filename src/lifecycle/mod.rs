//! Startup sequence
//!
//! ```text
//! PersistenceConfig::load
//!    ↓
//! ContainerBuilder::persistence + import::<Module>()   (ContextBinder::bind)
//!    ↓
//! OnModuleInit hooks
//!    ↓
//! OnApplicationBootstrap hooks, DatabaseMigrations first
//!    ↓
//! serving
//! ```
//!
//! Any hook error, or a phase exceeding its timeout, aborts startup with a
//! [`LifecycleError`].

mod application;
mod error;
mod manager;
mod traits;

pub use application::{Application, ApplicationBuilder};
pub use error::{LifecycleError, Phase, Result};
pub use manager::LifecycleManager;
pub use traits::{OnApplicationBootstrap, OnModuleInit};
