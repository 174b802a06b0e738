use crate::persistence::EngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModulithError>;

#[derive(Debug, Error)]
pub enum ModulithError {
    /// Startup configuration is unusable: unsupported provider, config not
    /// loaded, or two modules deriving the same store label.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The engine could not bring a module's schema up to date.
    #[error("Migration failed for {module} module: {source}")]
    Migration {
        module: String,
        #[source]
        source: EngineError,
    },

    #[error("Dependency not found: {type_name}")]
    DependencyNotFound { type_name: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Scope mismatch: {message}")]
    ScopeMismatch { message: String },

    #[error("Module registration failed: {message}")]
    ModuleRegistrationFailed { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ModulithError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn migration(module: impl Into<String>, source: EngineError) -> Self {
        Self::Migration {
            module: module.into(),
            source,
        }
    }
}
