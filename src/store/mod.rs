pub mod disk;
pub mod memory;

use crate::core::cache::{KeyValueCollection, Store};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

/// Hands out durable slot collections, one fjall partition each.
///
/// When the keyspace cannot be opened, or a partition cannot be created,
/// collections degrade to memory for the rest of the session.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Keyspace>,
}

impl KeyValueStore {
    pub fn open(data_path: &Path) -> Self {
        let store_dir = data_path.join("store");
        let keyspace = match fjall::Config::new(&store_dir).open() {
            Ok(keyspace) => {
                debug!(path = %store_dir.display(), "Opened keyspace");
                Some(keyspace)
            }
            Err(e) => {
                warn!(path = %store_dir.display(), error = %e, "Keyspace unavailable, state will not persist");
                None
            }
        };

        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.keyspace.is_some()
    }

    fn create_collection(&self, name: &str) -> Arc<dyn KeyValueCollection> {
        let disk = self.keyspace.as_ref().and_then(|ks| {
            ks.open_partition(name, PartitionCreateOptions::default())
                .map_err(|e| warn!(collection = name, error = %e, "Failed to open partition"))
                .ok()
                .map(|partition| {
                    Arc::new(DiskCollection::new(ks.clone(), partition))
                        as Arc<dyn KeyValueCollection>
                })
        });
        disk.unwrap_or_else(|| Arc::new(MemoryCollection::new()))
    }
}

impl Store for KeyValueStore {
    fn get_collection(&self, name: &str) -> Arc<dyn KeyValueCollection> {
        if let Ok(collections) = self.collections.read()
            && let Some(collection) = collections.get(name)
        {
            return Arc::clone(collection);
        }

        let collection = self.create_collection(name);
        match self.collections.write() {
            Ok(mut collections) => Arc::clone(
                collections
                    .entry(name.to_string())
                    .or_insert(collection),
            ),
            Err(_) => collection,
        }
    }
}
