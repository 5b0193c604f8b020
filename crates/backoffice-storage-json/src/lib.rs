use std::{
    collections::HashMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use backoffice_core::{
    store::{ArrayUpdate, DocumentStore, Filter, FindOptions, ID_FIELD},
    CoreError, CoreResult, MemoryStore,
};
use backoffice_domain::Counter;
use serde_json::Value as Json;
use tracing::{debug, error, info};

const FILE_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";

/// Document store persisted as one JSON array per collection under `root`.
///
/// Every collection is loaded at open and served from memory. Writes hold a
/// single lock across the in-memory update and the file rewrite, so counter
/// increments stay indivisible and files never interleave. When the rewrite
/// fails the in-memory change is undone, so readers never see a write that is
/// not on disk.
pub struct JsonDocumentStore {
    root: PathBuf,
    inner: MemoryStore,
    write_lock: Mutex<()>,
}

impl JsonDocumentStore {
    pub fn open(root: impl Into<PathBuf>) -> CoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut collections = HashMap::new();
        let mut counters = Vec::new();
        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if stem == Counter::COLLECTION {
                counters = read_json(&path)?;
            } else {
                collections.insert(stem.to_string(), read_json::<Vec<Json>>(&path)?);
            }
        }
        info!(
            root = %root.display(),
            collections = collections.len(),
            counters = counters.len(),
            "opened json document store"
        );
        Ok(Self {
            inner: MemoryStore::from_snapshot(collections, counters)?,
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.{FILE_EXTENSION}"))
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| CoreError::TransientStore("json store write lock poisoned".into()))
    }

    fn persist_collection(&self, collection: &str) -> CoreResult<()> {
        let documents = self.inner.export_collection(collection)?;
        save_json(&self.collection_path(collection), &documents)?;
        debug!(collection, documents = documents.len(), "persisted collection");
        Ok(())
    }

    fn persist_counters(&self) -> CoreResult<()> {
        let counters = self.inner.export_counters()?;
        save_json(&self.collection_path(Counter::COLLECTION), &counters)
    }

    /// Passes `persisted` through, running `undo` against memory first when it failed.
    fn undo_on_failure<U>(&self, scope: &str, persisted: CoreResult<()>, undo: U) -> CoreResult<()>
    where
        U: FnOnce(&MemoryStore) -> CoreResult<()>,
    {
        let Err(err) = persisted else {
            return Ok(());
        };
        match undo(&self.inner) {
            Ok(()) => debug!(scope, error = %err, "write not persisted, in-memory change undone"),
            Err(undo_err) => error!(
                scope,
                error = %err,
                undo_error = %undo_err,
                "write not persisted and in-memory change could not be undone"
            ),
        }
        Err(err)
    }

    fn restore_document(&self, collection: &str, id: &str, previous: Json) -> CoreResult<()> {
        let persisted = self.persist_collection(collection);
        self.undo_on_failure(collection, persisted, |inner| {
            inner.replace(collection, id, previous).map(|_| ())
        })
    }
}

impl DocumentStore for JsonDocumentStore {
    fn insert(&self, collection: &str, document: Json) -> CoreResult<()> {
        let _guard = self.lock()?;
        let id = document
            .get(ID_FIELD)
            .and_then(Json::as_str)
            .map(str::to_string);
        self.inner.insert(collection, document)?;
        let persisted = self.persist_collection(collection);
        self.undo_on_failure(collection, persisted, |inner| match id {
            Some(id) => inner.delete(collection, &id).map(|_| ()),
            None => Ok(()),
        })
    }

    fn get(&self, collection: &str, id: &str) -> CoreResult<Option<Json>> {
        self.inner.get(collection, id)
    }

    fn replace(&self, collection: &str, id: &str, document: Json) -> CoreResult<bool> {
        let _guard = self.lock()?;
        let Some(previous) = self.inner.get(collection, id)? else {
            return Ok(false);
        };
        if !self.inner.replace(collection, id, document)? {
            return Ok(false);
        }
        self.restore_document(collection, id, previous)?;
        Ok(true)
    }

    fn delete(&self, collection: &str, id: &str) -> CoreResult<bool> {
        let _guard = self.lock()?;
        let Some(previous) = self.inner.get(collection, id)? else {
            return Ok(false);
        };
        if !self.inner.delete(collection, id)? {
            return Ok(false);
        }
        let persisted = self.persist_collection(collection);
        self.undo_on_failure(collection, persisted, |inner| inner.insert(collection, previous))?;
        Ok(true)
    }

    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> CoreResult<Vec<Json>> {
        self.inner.find(collection, filter, options)
    }

    fn count(&self, collection: &str, filter: &Filter) -> CoreResult<usize> {
        self.inner.count(collection, filter)
    }

    fn update_array(&self, collection: &str, id: &str, update: &ArrayUpdate) -> CoreResult<Option<usize>> {
        let _guard = self.lock()?;
        let Some(previous) = self.inner.get(collection, id)? else {
            return Ok(None);
        };
        let Some(length) = self.inner.update_array(collection, id, update)? else {
            return Ok(None);
        };
        self.restore_document(collection, id, previous)?;
        Ok(Some(length))
    }

    fn increment_counter(&self, key: &str) -> CoreResult<u64> {
        let _guard = self.lock()?;
        let previous = self.inner.counter(key)?.map(|counter| counter.sequence_value);
        let value = self.inner.increment_counter(key)?;
        let persisted = self.persist_counters();
        self.undo_on_failure(key, persisted, |inner| inner.restore_counter(key, previous))?;
        Ok(value)
    }

    fn seed_counter(&self, key: &str, value: u64) -> CoreResult<bool> {
        let _guard = self.lock()?;
        let seeded = self.inner.seed_counter(key, value)?;
        if seeded {
            let persisted = self.persist_counters();
            self.undo_on_failure(key, persisted, |inner| inner.restore_counter(key, None))?;
        }
        Ok(seeded)
    }

    fn counter(&self, key: &str) -> CoreResult<Option<Counter>> {
        self.inner.counter(key)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|err| CoreError::Serde(format!("{}: {err}", path.display())))
}

fn save_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> CoreResult<()> {
    let data = serde_json::to_string_pretty(value)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
