//! `ClientRegistry` (spec.md §4.4): an in-memory set of clients, mirrored
//! to `TaskStore` on `append`. Written only from the Dispatcher's
//! single-threaded loop (spec.md §5), so a plain `HashMap` behind no lock
//! beyond what its single writer needs is sufficient; reads from Scheduler
//! and Executor only ever observe a fully-appended client.

use std::collections::HashMap;

use scheduler_shared::domain::Client;
use scheduler_shared::error::StoreError;

use crate::store::TaskStore;

pub struct ClientRegistry {
    clients: HashMap<String, Client>,
}

impl ClientRegistry {
    pub fn empty() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Populates the registry from `TaskStore.get_clients()`, per spec.md
    /// §4.4's startup contract.
    pub async fn load(store: &TaskStore) -> Result<Self, StoreError> {
        let clients = store.get_clients().await?;
        Ok(Self {
            clients: clients.into_iter().map(|c| (c.name.clone(), c)).collect(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clients.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Client> {
        self.clients.get(name)
    }

    /// Inserts `client`, persisting it to `store` first so the in-memory
    /// view never diverges from what survives a restart.
    pub async fn append(&mut self, store: &TaskStore, client: Client) -> Result<(), StoreError> {
        store.add_client(&client).await?;
        self.clients.insert(client.name.clone(), client);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_then_contains_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(&dir.path().join("t.sqlite3")).await.unwrap();
        let mut registry = ClientRegistry::empty();

        registry
            .append(
                &store,
                Client {
                    name: "c1".to_string(),
                    enable_overdue: true,
                },
            )
            .await
            .unwrap();

        assert!(registry.contains("c1"));
        assert_eq!(registry.get("c1").unwrap().enable_overdue, true);
        assert!(!registry.contains("unknown"));
    }

    #[tokio::test]
    async fn load_restores_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(&dir.path().join("t.sqlite3")).await.unwrap();
        store
            .add_client(&Client {
                name: "c1".to_string(),
                enable_overdue: false,
            })
            .await
            .unwrap();

        let registry = ClientRegistry::load(&store).await.unwrap();
        assert!(registry.contains("c1"));
    }
}
