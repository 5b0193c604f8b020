//! In-process [`DocumentStore`] used by tests and as the engine behind file-backed stores.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use backoffice_domain::Counter;
use serde_json::Value as Json;

use crate::{
    store::{ArrayUpdate, DocumentStore, Filter, FindOptions, ID_FIELD},
    CoreError, CoreResult,
};

#[derive(Debug, Default)]
struct StoreState {
    collections: HashMap<String, BTreeMap<String, Json>>,
    counters: BTreeMap<String, u64>,
}

/// Thread-safe document store holding every collection in memory.
///
/// Counter operations take the write lock for their whole read-increment-write,
/// which makes them indivisible for concurrent callers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from previously exported collections and counters.
    pub fn from_snapshot(collections: HashMap<String, Vec<Json>>, counters: Vec<Counter>) -> CoreResult<Self> {
        let mut state = StoreState::default();
        for (name, documents) in collections {
            let collection = state.collections.entry(name.clone()).or_default();
            for document in documents {
                let id = document_id(&document)?;
                collection.insert(id, document);
            }
        }
        for counter in counters {
            state.counters.insert(counter.id, counter.sequence_value);
        }
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    pub fn collection_names(&self) -> CoreResult<Vec<String>> {
        let state = self.read()?;
        let mut names: Vec<String> = state.collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn export_collection(&self, collection: &str) -> CoreResult<Vec<Json>> {
        let state = self.read()?;
        Ok(state
            .collections
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }

    pub fn export_counters(&self) -> CoreResult<Vec<Counter>> {
        let state = self.read()?;
        Ok(state
            .counters
            .iter()
            .map(|(key, value)| Counter::new(key.clone(), *value))
            .collect())
    }

    /// Puts a counter back to `value`, removing it when `None`.
    pub fn restore_counter(&self, key: &str, value: Option<u64>) -> CoreResult<()> {
        let mut state = self.write()?;
        match value {
            Some(value) => state.counters.insert(key.to_string(), value),
            None => state.counters.remove(key),
        };
        Ok(())
    }

    fn read(&self) -> CoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| CoreError::TransientStore("memory store lock poisoned".into()))
    }

    fn write(&self) -> CoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| CoreError::TransientStore("memory store lock poisoned".into()))
    }
}

fn document_id(document: &Json) -> CoreResult<String> {
    document
        .get(ID_FIELD)
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| CoreError::Validation("document is missing a string `_id`".into()))
}

impl DocumentStore for MemoryStore {
    fn insert(&self, collection: &str, document: Json) -> CoreResult<()> {
        let id = document_id(&document)?;
        let mut state = self.write()?;
        let documents = state.collections.entry(collection.to_string()).or_default();
        if documents.contains_key(&id) {
            return Err(CoreError::Conflict(format!(
                "duplicate id `{id}` in `{collection}`"
            )));
        }
        documents.insert(id, document);
        Ok(())
    }

    fn get(&self, collection: &str, id: &str) -> CoreResult<Option<Json>> {
        let state = self.read()?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    fn replace(&self, collection: &str, id: &str, document: Json) -> CoreResult<bool> {
        if document_id(&document)? != id {
            return Err(CoreError::Validation(format!(
                "replacement document id does not match `{id}`"
            )));
        }
        let mut state = self.write()?;
        match state
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
        {
            Some(slot) => {
                *slot = document;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, collection: &str, id: &str) -> CoreResult<bool> {
        let mut state = self.write()?;
        Ok(state
            .collections
            .get_mut(collection)
            .map(|documents| documents.remove(id).is_some())
            .unwrap_or(false))
    }

    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> CoreResult<Vec<Json>> {
        let matcher = filter.compile()?;
        let state = self.read()?;
        let Some(documents) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut matched: Vec<&Json> = documents
            .values()
            .filter(|document| matcher.matches(document))
            .collect();
        if !options.sort.is_empty() {
            matched.sort_by(|left, right| options.compare(left, right));
        }
        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .skip(options.skip)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count(&self, collection: &str, filter: &Filter) -> CoreResult<usize> {
        let matcher = filter.compile()?;
        let state = self.read()?;
        Ok(state
            .collections
            .get(collection)
            .map(|documents| documents.values().filter(|doc| matcher.matches(doc)).count())
            .unwrap_or(0))
    }

    fn update_array(&self, collection: &str, id: &str, update: &ArrayUpdate) -> CoreResult<Option<usize>> {
        let mut state = self.write()?;
        let Some(document) = state
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
        else {
            return Ok(None);
        };
        let mut edited = document.clone();
        let length = update.apply(&mut edited)?;
        *document = edited;
        Ok(Some(length))
    }

    fn increment_counter(&self, key: &str) -> CoreResult<u64> {
        let mut state = self.write()?;
        let value = state.counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    fn seed_counter(&self, key: &str, value: u64) -> CoreResult<bool> {
        let mut state = self.write()?;
        if state.counters.contains_key(key) {
            return Ok(false);
        }
        state.counters.insert(key.to_string(), value);
        Ok(true)
    }

    fn counter(&self, key: &str) -> CoreResult<Option<Counter>> {
        let state = self.read()?;
        Ok(state
            .counters
            .get(key)
            .map(|value| Counter::new(key, *value)))
    }
}
