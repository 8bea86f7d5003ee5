use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::{
    Collection, Document, EntityStore, Predicate, StoreError, StoredDocument, INITIAL_VERSION,
};

/// Process-local entity store used by the service binary, demos, and tests.
///
/// Each call is atomic; sequences of calls are not, so a read followed by a conditional update
/// can observe a `VersionConflict` when another caller wrote in between.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<Collection, BTreeMap<String, Entry>>,
    sequences: HashMap<Collection, u64>,
}

#[derive(Debug, Clone)]
struct Entry {
    version: u64,
    body: Document,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.lock()
            .map(|state| {
                state
                    .collections
                    .get(&collection)
                    .map(BTreeMap::len)
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl EntityStore for MemoryEntityStore {
    fn get(&self, collection: Collection, id: &str) -> Result<StoredDocument, StoreError> {
        let state = self.lock()?;
        state
            .collections
            .get(&collection)
            .and_then(|records| records.get(id))
            .map(|entry| StoredDocument {
                id: id.to_string(),
                version: entry.version,
                body: entry.body.clone(),
            })
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })
    }

    fn query(
        &self,
        collection: Collection,
        predicates: &[Predicate],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let state = self.lock()?;
        let Some(records) = state.collections.get(&collection) else {
            return Ok(Vec::new());
        };

        Ok(records
            .iter()
            .filter(|(_, entry)| predicates.iter().all(|clause| clause.matches(&entry.body)))
            .map(|(id, entry)| StoredDocument {
                id: id.clone(),
                version: entry.version,
                body: entry.body.clone(),
            })
            .collect())
    }

    fn insert(&self, collection: Collection, document: Document) -> Result<String, StoreError> {
        let mut state = self.lock()?;
        let sequence = state.sequences.entry(collection).or_insert(0);
        *sequence += 1;
        let id = format!("{}-{:06}", collection.id_prefix(), sequence);

        state.collections.entry(collection).or_default().insert(
            id.clone(),
            Entry {
                version: INITIAL_VERSION,
                body: document,
            },
        );
        Ok(id)
    }

    fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let entry = state
            .collections
            .get_mut(&collection)
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        if let Some(expected) = expected_version {
            if entry.version != expected {
                return Err(StoreError::VersionConflict {
                    collection,
                    id: id.to_string(),
                    expected,
                    actual: entry.version,
                });
            }
        }

        for (field, value) in patch {
            entry.body.insert(field, value);
        }
        entry.version += 1;
        Ok(entry.version)
    }
}
