//! Named in-memory stores used when `useInMemoryDb` is on

use crate::error::{ModulithError, Result};
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Process-wide registry of in-memory stores, keyed by module label.
///
/// Each module's context opens the store named after its label, so
/// `CATALOG` and `ORDERING` never see each other's rows.
#[derive(Default)]
pub struct InMemoryDatabaseRoot {
    stores: DashMap<String, Arc<InMemoryStore>>,
}

impl InMemoryDatabaseRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the store called `name`, creating it on first use.
    pub fn store(&self, name: &str) -> Arc<InMemoryStore> {
        self.stores
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!("Creating in-memory store {}", name);
                Arc::new(InMemoryStore::new(name))
            })
            .clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }

    /// Names of all stores opened so far, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.iter().map(|s| s.key().clone()).collect();
        names.sort();
        names
    }
}

/// Rows grouped by table, each row a JSON value keyed by id.
pub struct InMemoryStore {
    name: String,
    tables: DashMap<String, DashMap<String, Value>>,
}

impl InMemoryStore {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tables: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert<T: Serialize>(&self, table: &str, id: &str, row: &T) -> Result<()> {
        let value = serde_json::to_value(row)?;
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(id.to_string(), value);
        Ok(())
    }

    /// Insert under a fresh id and return it
    pub fn add<T: Serialize>(&self, table: &str, row: &T) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.insert(table, &id.to_string(), row)?;
        Ok(id)
    }

    pub fn get<T: DeserializeOwned>(&self, table: &str, id: &str) -> Result<Option<T>> {
        let Some(rows) = self.tables.get(table) else {
            return Ok(None);
        };
        let Some(row) = rows.get(id) else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(row.value().clone())?))
    }

    /// All rows of `table`, ordered by id
    pub fn scan<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let Some(rows) = self.tables.get(table) else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<(String, Value)> = rows
            .iter()
            .map(|row| (row.key().clone(), row.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
            .into_iter()
            .map(|(_, value)| serde_json::from_value(value).map_err(ModulithError::from))
            .collect()
    }

    pub fn remove(&self, table: &str, id: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|rows| rows.remove(id).is_some())
    }

    /// Number of rows in `table`
    pub fn count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |rows| rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Product {
        name: String,
        price: u32,
    }

    fn product(name: &str, price: u32) -> Product {
        Product {
            name: name.to_string(),
            price,
        }
    }

    #[test]
    fn test_root_returns_same_store_for_name() {
        let root = InMemoryDatabaseRoot::new();
        let a = root.store("CATALOG");
        let b = root.store("CATALOG");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(root.names(), vec!["CATALOG".to_string()]);
    }

    #[test]
    fn test_stores_are_isolated() {
        let root = InMemoryDatabaseRoot::new();
        let catalog = root.store("CATALOG");
        let ordering = root.store("ORDERING");

        catalog.insert("products", "p-1", &product("Keyboard", 40)).unwrap();

        assert_eq!(catalog.count("products"), 1);
        assert_eq!(ordering.count("products"), 0);
        assert!(ordering.get::<Product>("products", "p-1").unwrap().is_none());
    }

    #[test]
    fn test_insert_get_scan_remove() {
        let root = InMemoryDatabaseRoot::new();
        let store = root.store("CATALOG");

        store.insert("products", "b", &product("Mouse", 15)).unwrap();
        store.insert("products", "a", &product("Keyboard", 40)).unwrap();
        let id = store.add("products", &product("Monitor", 200)).unwrap();

        assert_eq!(
            store.get::<Product>("products", &id.to_string()).unwrap(),
            Some(product("Monitor", 200))
        );

        store.remove("products", &id.to_string());
        let rows: Vec<Product> = store.scan("products").unwrap();
        assert_eq!(rows, vec![product("Keyboard", 40), product("Mouse", 15)]);
        assert!(!store.remove("orders", "a"));
    }
}
