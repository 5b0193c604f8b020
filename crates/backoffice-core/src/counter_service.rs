//! Sequential code allocation backed by persisted atomic counters.

use std::{sync::Arc, thread, time::Duration};

use backoffice_domain::{Coded, Counter, Document};
use tracing::{debug, info, warn};

use crate::{
    store::{DocumentStore, Filter, StoreExt},
    CoreError, CoreResult,
};

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);
pub const DEFAULT_CODE_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorOptions {
    /// Retries after the first collision before giving up.
    pub max_retries: u32,
    /// Base delay; retry `n` sleeps `backoff * n`.
    pub backoff: Duration,
    /// Zero-padded digits appended to the prefix.
    pub width: usize,
}

impl Default for AllocatorOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
            width: DEFAULT_CODE_WIDTH,
        }
    }
}

/// Allocates unique `prefix + NNNN` codes from per-model counters.
#[derive(Clone)]
pub struct CodeAllocator {
    store: Arc<dyn DocumentStore>,
    options: AllocatorOptions,
}

impl CodeAllocator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_options(store, AllocatorOptions::default())
    }

    pub fn with_options(store: Arc<dyn DocumentStore>, options: AllocatorOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> AllocatorOptions {
        self.options
    }

    /// Returns the next unused code for model `D` under `prefix`.
    ///
    /// The counter increment is a single store operation. A code that already exists
    /// in the collection (legacy data, manual inserts) is skipped and retried with
    /// linear backoff until the retry budget runs out.
    pub fn next_code<D: Document + Coded>(&self, prefix: &str) -> CoreResult<String> {
        let key = Counter::model_key(D::MODEL, prefix);
        let width = self.options.width;
        self.allocate_unused::<D, _>(key, |sequence| Ok(format_code(prefix, sequence, width)))
    }

    /// Seeds the `D`/`prefix` counter from the highest existing code.
    ///
    /// Returns the seeded value, or `None` when the counter already existed.
    pub fn initialize_counter<D: Document + Coded>(&self, prefix: &str) -> CoreResult<Option<u64>> {
        let key = Counter::model_key(D::MODEL, prefix);
        if self.store.counter(&key)?.is_some() {
            return Ok(None);
        }
        let highest = self.highest_existing::<D>(prefix)?;
        if self.store.seed_counter(&key, highest)? {
            info!(%key, highest, "seeded counter from existing codes");
            Ok(Some(highest))
        } else {
            Ok(None)
        }
    }

    /// Returns the next unused code rendered from a scoped counter, seeding the
    /// counter from `seed` on first use.
    ///
    /// Seeding is insert-if-absent, so concurrent first callers still receive
    /// distinct values. A rendered code that already exists in `D`'s collection
    /// (written by the read-max strategy, for instance) is skipped under the same
    /// retry budget as [`CodeAllocator::next_code`].
    pub fn next_scoped<D, S, R>(&self, key: &str, seed: S, render: R) -> CoreResult<String>
    where
        D: Document + Coded,
        S: FnOnce() -> CoreResult<u64>,
        R: Fn(u64) -> CoreResult<String>,
    {
        if self.store.counter(key)?.is_none() {
            let start = seed()?;
            if self.store.seed_counter(key, start)? {
                debug!(%key, start, "seeded scoped counter");
            }
        }
        self.allocate_unused::<D, _>(key.to_string(), render)
    }

    /// Increments `key` until `render` yields a code absent from `D`'s collection.
    fn allocate_unused<D, R>(&self, key: String, render: R) -> CoreResult<String>
    where
        D: Document + Coded,
        R: Fn(u64) -> CoreResult<String>,
    {
        let mut retries = 0u32;
        loop {
            let sequence = self.store.increment_counter(&key)?;
            let code = render(sequence)?;
            if !self.code_in_use::<D>(&code)? {
                debug!(%key, %code, "allocated code");
                return Ok(code);
            }
            if retries >= self.options.max_retries {
                warn!(%key, %code, retries, "code allocation retry budget exhausted");
                return Err(CoreError::ExhaustedRetries {
                    key,
                    attempts: retries + 1,
                });
            }
            retries += 1;
            warn!(%key, %code, retries, "allocated code already in use, retrying");
            thread::sleep(self.options.backoff * retries);
        }
    }

    fn code_in_use<D: Document + Coded>(&self, code: &str) -> CoreResult<bool> {
        Ok(self.store.count_docs::<D>(&Filter::eq(D::CODE_FIELD, code))? > 0)
    }

    fn highest_existing<D: Document + Coded>(&self, prefix: &str) -> CoreResult<u64> {
        let filter = Filter::Regex {
            path: D::CODE_FIELD.to_string(),
            pattern: format!("^{}[0-9]+$", regex::escape(prefix)),
            case_insensitive: false,
        };
        let documents = self.store.find_docs::<D>(&filter, &Default::default())?;
        Ok(documents
            .iter()
            .filter_map(|document| document.code().get(prefix.len()..))
            .filter_map(|digits| digits.parse::<u64>().ok())
            .max()
            .unwrap_or(0))
    }
}

pub fn format_code(prefix: &str, sequence: u64, width: usize) -> String {
    format!("{prefix}{sequence:0width$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use backoffice_domain::{Provider, ProviderDraft};
    use std::collections::BTreeSet;

    fn quick_options() -> AllocatorOptions {
        AllocatorOptions {
            backoff: Duration::ZERO,
            ..AllocatorOptions::default()
        }
    }

    fn store_with_codes(codes: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for code in codes {
            store
                .insert_doc(&Provider::from_draft(*code, ProviderDraft::new("Legacy", "J-1")))
                .unwrap();
        }
        store
    }

    #[test]
    fn codes_are_prefix_plus_four_padded_digits() {
        let allocator = CodeAllocator::new(Arc::new(MemoryStore::new()));
        assert_eq!(allocator.next_code::<Provider>("PRV").unwrap(), "PRV0001");
        assert_eq!(allocator.next_code::<Provider>("PRV").unwrap(), "PRV0002");
        assert_eq!(allocator.next_code::<Provider>("EXT").unwrap(), "EXT0001");
    }

    #[test]
    fn concurrent_allocations_are_distinct_and_contiguous() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        store.seed_counter("Provider_PRV", 41).unwrap();
        let allocator = CodeAllocator::with_options(store, quick_options());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = allocator.clone();
                thread::spawn(move || {
                    (0..25)
                        .map(|_| allocator.next_code::<Provider>("PRV").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let codes: Vec<String> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        let numbers: BTreeSet<u64> = codes
            .iter()
            .map(|code| code["PRV".len()..].parse().unwrap())
            .collect();
        assert_eq!(numbers.len(), codes.len());
        assert_eq!(numbers, (42..=241).collect::<BTreeSet<u64>>());
    }

    #[test]
    fn collisions_are_skipped() {
        let store = store_with_codes(&["PRV0001", "PRV0002"]);
        let allocator = CodeAllocator::with_options(store, quick_options());
        assert_eq!(allocator.next_code::<Provider>("PRV").unwrap(), "PRV0003");
    }

    #[test]
    fn retry_budget_exhaustion_is_reported() {
        let codes: Vec<String> = (1..=6).map(|n| format_code("PRV", n, 4)).collect();
        let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
        let allocator = CodeAllocator::with_options(store_with_codes(&refs), quick_options());

        let err = allocator.next_code::<Provider>("PRV").unwrap_err();
        assert!(
            matches!(err, CoreError::ExhaustedRetries { attempts: 6, ref key } if key == "Provider_PRV"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn initialize_counter_seeds_from_highest_code_once() {
        let store = store_with_codes(&["PRV0004", "PRV0017", "OTHER9", "PRVX"]);
        let allocator = CodeAllocator::with_options(store, quick_options());

        assert_eq!(allocator.initialize_counter::<Provider>("PRV").unwrap(), Some(17));
        assert_eq!(allocator.initialize_counter::<Provider>("PRV").unwrap(), None);
        assert_eq!(allocator.next_code::<Provider>("PRV").unwrap(), "PRV0018");
    }

    #[test]
    fn scoped_counter_seeds_then_increments() {
        let allocator = CodeAllocator::new(Arc::new(MemoryStore::new()));
        let render = |sequence: u64| -> CoreResult<String> { Ok(format_code("S", sequence, 2)) };
        assert_eq!(
            allocator.next_scoped::<Provider, _, _>("Provider:x", || Ok(4), render).unwrap(),
            "S05"
        );
        assert_eq!(
            allocator.next_scoped::<Provider, _, _>("Provider:x", || Ok(99), render).unwrap(),
            "S06"
        );
    }

    #[test]
    fn scoped_codes_skip_existing_documents() {
        let allocator = CodeAllocator::with_options(store_with_codes(&["S02", "S03"]), quick_options());
        let render = |sequence: u64| -> CoreResult<String> { Ok(format_code("S", sequence, 2)) };
        assert_eq!(
            allocator.next_scoped::<Provider, _, _>("Provider:x", || Ok(1), render).unwrap(),
            "S04"
        );
    }

    #[test]
    fn scoped_codes_report_exhaustion() {
        let codes: Vec<String> = (1..=6).map(|n| format_code("S", n, 2)).collect();
        let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
        let allocator = CodeAllocator::with_options(store_with_codes(&refs), quick_options());

        let err = allocator
            .next_scoped::<Provider, _, _>("Provider:x", || Ok(0), |n| Ok(format_code("S", n, 2)))
            .unwrap_err();
        assert!(
            matches!(err, CoreError::ExhaustedRetries { attempts: 6, ref key } if key == "Provider:x"),
            "unexpected error: {err:?}"
        );
    }
}
