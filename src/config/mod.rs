//! Configuration loading
//!
//! Configuration comes from two layers, applied in order:
//!
//! 1. a JSON settings document (`appsettings.json` style, one object per section)
//! 2. environment variables, using `Section__Key` names (`DbConfig__Provider`)
//!
//! Later layers override earlier ones. The resulting [`PersistenceConfig`] is
//! immutable and shared through the container as `Arc<PersistenceConfig>`.

mod persistence;

pub use persistence::{PersistenceConfig, SECTION};

use dashmap::DashMap;
use std::env;
use std::ffi::OsString;
use std::sync::Arc;

/// Separator between a section name and a key in environment variable names
const ENV_SEPARATOR: &str = "__";

/// Flat key/value configuration source
///
/// Keys are stored normalized (`section:key`, lower case), so
/// `DbConfig__Provider`, `DBCONFIG__PROVIDER` and `dbconfig:provider` all
/// address the same value.
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Load the environment variables of the current process.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn new() -> Self {
        Self::from_os_pairs(env::vars_os())
    }

    fn from_os_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        Self::from_pairs(pairs.into_iter().filter_map(|(key, value)| {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    tracing::debug!("Skipping non UTF-8 environment variable {:?}", key);
                    None
                }
            }
        }))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let service = Self::default();
        for (key, value) in pairs {
            service.set(key.as_ref(), value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(&normalize_key(key)).map(|v| v.clone())
    }

    /// Value of `key` inside `section`
    pub fn get_section(&self, section: &str, key: &str) -> Option<String> {
        self.get(&format!("{section}:{key}"))
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.config.insert(normalize_key(key), value.into());
    }

    pub fn len(&self) -> usize {
        self.config.len()
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().replace(ENV_SEPARATOR, ":").to_ascii_lowercase()
}
