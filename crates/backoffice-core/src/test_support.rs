use std::{collections::HashSet, sync::Mutex};

use backoffice_domain::Counter;
use serde_json::Value as Json;

use crate::{
    store::{ArrayUpdate, DocumentStore, Filter, FindOptions},
    CoreError, CoreResult, MemoryStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Insert,
    Replace,
    Delete,
    UpdateArray,
}

/// Memory store that fails chosen writes with a transient error.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<(Op, String)>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_insert_on(&self, collection: &str) {
        self.arm(Op::Insert, collection);
    }

    pub fn fail_replace_on(&self, collection: &str) {
        self.arm(Op::Replace, collection);
    }

    pub fn fail_delete_on(&self, collection: &str) {
        self.arm(Op::Delete, collection);
    }

    pub fn fail_update_array_on(&self, collection: &str) {
        self.arm(Op::UpdateArray, collection);
    }

    fn arm(&self, op: Op, collection: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert((op, collection.to_string()));
    }

    fn check(&self, op: Op, collection: &str) -> CoreResult<()> {
        if self
            .failing
            .lock()
            .unwrap()
            .contains(&(op, collection.to_string()))
        {
            return Err(CoreError::TransientStore(format!(
                "injected {op:?} failure on `{collection}`"
            )));
        }
        Ok(())
    }
}

impl DocumentStore for FlakyStore {
    fn insert(&self, collection: &str, document: Json) -> CoreResult<()> {
        self.check(Op::Insert, collection)?;
        self.inner.insert(collection, document)
    }

    fn get(&self, collection: &str, id: &str) -> CoreResult<Option<Json>> {
        self.inner.get(collection, id)
    }

    fn replace(&self, collection: &str, id: &str, document: Json) -> CoreResult<bool> {
        self.check(Op::Replace, collection)?;
        self.inner.replace(collection, id, document)
    }

    fn delete(&self, collection: &str, id: &str) -> CoreResult<bool> {
        self.check(Op::Delete, collection)?;
        self.inner.delete(collection, id)
    }

    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> CoreResult<Vec<Json>> {
        self.inner.find(collection, filter, options)
    }

    fn count(&self, collection: &str, filter: &Filter) -> CoreResult<usize> {
        self.inner.count(collection, filter)
    }

    fn update_array(&self, collection: &str, id: &str, update: &ArrayUpdate) -> CoreResult<Option<usize>> {
        self.check(Op::UpdateArray, collection)?;
        self.inner.update_array(collection, id, update)
    }

    fn increment_counter(&self, key: &str) -> CoreResult<u64> {
        self.inner.increment_counter(key)
    }

    fn seed_counter(&self, key: &str, value: u64) -> CoreResult<bool> {
        self.inner.seed_counter(key, value)
    }

    fn counter(&self, key: &str) -> CoreResult<Option<Counter>> {
        self.inner.counter(key)
    }
}
