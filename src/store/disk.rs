use crate::core::cache::KeyValueCollection;
use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionHandle, PersistMode};
use tracing::debug;

/// Slot collection backed by a fjall partition. Every write is fsynced before
/// returning.
pub struct DiskCollection {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Keyspace, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn sync(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist keyspace")
    }
}

impl KeyValueCollection for DiskCollection {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .partition
            .get(key)
            .with_context(|| format!("Failed to read slot: {key}"))?;
        debug!(key, hit = value.is_some(), "Disk slot GET");
        Ok(value.map(|v| v.to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.partition
            .insert(key, value)
            .with_context(|| format!("Failed to write slot: {key}"))?;
        debug!(key, "Disk slot PUT");
        self.sync()
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.partition
            .remove(key)
            .with_context(|| format!("Failed to remove slot: {key}"))?;
        debug!(key, "Disk slot REMOVE");
        self.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjall::PartitionCreateOptions;
    use tempfile::tempdir;

    fn open(path: &std::path::Path) -> DiskCollection {
        let keyspace = fjall::Config::new(path).open().unwrap();
        let partition = keyspace
            .open_partition("test", PartitionCreateOptions::default())
            .unwrap();
        DiskCollection::new(keyspace, partition)
    }

    #[test]
    fn test_disk_collection_get_put_remove() {
        let dir = tempdir().unwrap();
        let collection = open(dir.path());

        assert!(collection.get("slot").unwrap().is_none());

        collection.put("slot", b"[\"EUR\"]").unwrap();
        assert_eq!(collection.get("slot").unwrap(), Some(b"[\"EUR\"]".to_vec()));

        collection.remove("slot").unwrap();
        assert!(collection.get("slot").unwrap().is_none());
    }

    #[test]
    fn test_disk_collection_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let collection = open(dir.path());
            collection.put("slot", b"[\"GBP\",\"USD\"]").unwrap();
        }

        let collection = open(dir.path());
        assert_eq!(
            collection.get("slot").unwrap(),
            Some(b"[\"GBP\",\"USD\"]".to_vec())
        );
    }
}
