use std::collections::HashMap;
use std::path::{Path, PathBuf};

use geo_recommender_shared::models::Person;
use redb::{Database, ReadableDatabase, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreError;

const NODES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("nodes");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");
const ROOT_KEY: &str = "root_id";

/// Nodes written per transaction when flushing a freshly built index.
const FLUSH_BATCH: usize = 100_000;

/// A k-d tree node: a person plus the ids of its subtree roots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub person: Person,
    pub left: Option<u64>,
    pub right: Option<u64>,
}

impl Node {
    pub fn leaf(person: Person) -> Self {
        Node {
            person,
            left: None,
            right: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.person.id
    }
}

/// Key-value backing for the index, addressed by person id.
pub trait NodeStore: Send + Sync {
    fn get(&self, id: u64) -> Result<Option<Node>, StoreError>;
    fn put(&mut self, node: Node) -> Result<(), StoreError>;
    /// Replace the whole contents with `nodes` and `root`.
    fn replace_all(&mut self, nodes: Vec<Node>, root: Option<u64>) -> Result<(), StoreError>;
    fn root(&self) -> Result<Option<u64>, StoreError>;
    fn set_root(&mut self, root: u64) -> Result<(), StoreError>;
    fn count(&self) -> Result<u64, StoreError>;
}

#[derive(Default)]
pub struct MemoryStore {
    nodes: HashMap<u64, Node>,
    root: Option<u64>,
}

impl NodeStore for MemoryStore {
    fn get(&self, id: u64) -> Result<Option<Node>, StoreError> {
        Ok(self.nodes.get(&id).cloned())
    }

    fn put(&mut self, node: Node) -> Result<(), StoreError> {
        self.nodes.insert(node.id(), node);
        Ok(())
    }

    fn replace_all(&mut self, nodes: Vec<Node>, root: Option<u64>) -> Result<(), StoreError> {
        self.nodes = nodes.into_iter().map(|n| (n.id(), n)).collect();
        self.root = root;
        Ok(())
    }

    fn root(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.root)
    }

    fn set_root(&mut self, root: u64) -> Result<(), StoreError> {
        self.root = Some(root);
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(self.nodes.len() as u64)
    }
}

/// Persistent node store, so a built index survives restarts.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(StoreError::storage)?;

        // Ensure tables exist so read transactions can open them
        let write_txn = db.begin_write().map_err(StoreError::storage)?;
        {
            write_txn.open_table(NODES_TABLE).map_err(StoreError::storage)?;
            write_txn.open_table(META_TABLE).map_err(StoreError::storage)?;
        }
        write_txn.commit().map_err(StoreError::storage)?;

        Ok(RedbStore {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn size_bytes(&self) -> Result<u64, StoreError> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(StoreError::storage)
    }
}

impl NodeStore for RedbStore {
    fn get(&self, id: u64) -> Result<Option<Node>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::storage)?;
        let table = read_txn.open_table(NODES_TABLE).map_err(StoreError::storage)?;

        match table.get(id).map_err(StoreError::storage)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn put(&mut self, node: Node) -> Result<(), StoreError> {
        let json = serde_json::to_vec(&node)?;

        let write_txn = self.db.begin_write().map_err(StoreError::storage)?;
        {
            let mut table = write_txn.open_table(NODES_TABLE).map_err(StoreError::storage)?;
            table
                .insert(node.id(), json.as_slice())
                .map_err(StoreError::storage)?;
        }
        write_txn.commit().map_err(StoreError::storage)?;
        Ok(())
    }

    fn replace_all(&mut self, nodes: Vec<Node>, root: Option<u64>) -> Result<(), StoreError> {
        let total = nodes.len();

        let write_txn = self.db.begin_write().map_err(StoreError::storage)?;
        {
            write_txn.delete_table(NODES_TABLE).map_err(StoreError::storage)?;
            write_txn.delete_table(META_TABLE).map_err(StoreError::storage)?;
            write_txn.open_table(NODES_TABLE).map_err(StoreError::storage)?;
            write_txn.open_table(META_TABLE).map_err(StoreError::storage)?;
        }
        write_txn.commit().map_err(StoreError::storage)?;

        let mut written = 0;
        let mut pending = nodes.into_iter().peekable();
        while pending.peek().is_some() {
            let write_txn = self.db.begin_write().map_err(StoreError::storage)?;
            {
                let mut table = write_txn.open_table(NODES_TABLE).map_err(StoreError::storage)?;
                for node in pending.by_ref().take(FLUSH_BATCH) {
                    let json = serde_json::to_vec(&node)?;
                    table
                        .insert(node.id(), json.as_slice())
                        .map_err(StoreError::storage)?;
                    written += 1;
                }
            }
            write_txn.commit().map_err(StoreError::storage)?;
            info!(written, total, "flushed index nodes to disk");
        }

        if let Some(root) = root {
            self.set_root(root)?;
        }
        Ok(())
    }

    fn root(&self) -> Result<Option<u64>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::storage)?;
        let table = read_txn.open_table(META_TABLE).map_err(StoreError::storage)?;
        let root = table.get(ROOT_KEY).map_err(StoreError::storage)?;
        Ok(root.map(|v| v.value()))
    }

    fn set_root(&mut self, root: u64) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::storage)?;
        {
            let mut table = write_txn.open_table(META_TABLE).map_err(StoreError::storage)?;
            table.insert(ROOT_KEY, root).map_err(StoreError::storage)?;
        }
        write_txn.commit().map_err(StoreError::storage)?;
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::storage)?;
        let table = read_txn.open_table(NODES_TABLE).map_err(StoreError::storage)?;
        table.len().map_err(StoreError::storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: u64) -> Person {
        Person {
            id,
            name: format!("person,{id}"),
            age: 20 + id as u32,
            latitude: id as f64,
            longitude: -(id as f64),
        }
    }

    fn exercise(store: &mut dyn NodeStore) {
        assert_eq!(store.root().unwrap(), None);
        assert_eq!(store.count().unwrap(), 0);

        let mut root = Node::leaf(person(1));
        root.right = Some(2);
        store
            .replace_all(vec![root.clone(), Node::leaf(person(2))], Some(1))
            .unwrap();

        assert_eq!(store.root().unwrap(), Some(1));
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get(1).unwrap(), Some(root));
        assert_eq!(store.get(3).unwrap(), None);

        store.put(Node::leaf(person(3))).unwrap();
        assert_eq!(store.count().unwrap(), 3);

        // Replacing drops everything that was there before
        store.replace_all(vec![Node::leaf(person(9))], Some(9)).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get(1).unwrap(), None);
        assert_eq!(store.root().unwrap(), Some(9));
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::default();
        exercise(&mut store);
    }

    #[test]
    fn test_redb_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RedbStore::open(&dir.path().join("index.redb")).unwrap();
        exercise(&mut store);
        assert!(store.size_bytes().unwrap() > 0);
    }

    #[test]
    fn test_redb_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.redb");
        {
            let mut store = RedbStore::open(&path).unwrap();
            store
                .replace_all(vec![Node::leaf(person(4))], Some(4))
                .unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.root().unwrap(), Some(4));
        assert_eq!(store.get(4).unwrap().unwrap().person.name, "person,4");
    }

    #[test]
    fn test_node_json_is_flat() {
        let node = Node::leaf(person(5));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], 5);
        assert_eq!(json["name"], "person,5");
        assert!(json["left"].is_null());
    }
}
