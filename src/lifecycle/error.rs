use std::time::Duration;
use strum_macros::Display;
use thiserror::Error;

/// Startup phase a hook belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    #[strum(serialize = "module init")]
    ModuleInit,
    #[strum(serialize = "application bootstrap")]
    ApplicationBootstrap,
}

/// Why the application did not start
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("startup aborted: {0}")]
    Startup(String),

    #[error("{phase} did not finish within {after:?}")]
    Timeout { phase: Phase, after: Duration },

    /// A hook returned an error; `message` is the hook's own error text
    #[error("{phase} hook `{hook}` failed: {message}")]
    HookFailed {
        phase: Phase,
        hook: String,
        message: String,
    },
}

impl LifecycleError {
    pub fn startup(message: impl Into<String>) -> Self {
        Self::Startup(message.into())
    }

    pub fn timeout(phase: Phase, after: Duration) -> Self {
        Self::Timeout { phase, after }
    }

    pub fn hook_failed(phase: Phase, hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HookFailed {
            phase,
            hook: hook.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
