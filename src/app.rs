//! Wires the configured store into the ledger services.

use std::{path::Path, sync::Arc, time::Duration};

use backoffice_config::{Config, HierarchyStrategy};
use backoffice_core::{
    store::{DocumentStore, Filter, StoreExt},
    AllocatorOptions, BalanceService, ChartService, CodeAllocator, CodeStrategy, CoreError,
    DailyBookService, FiscalYearService, HierarchyCodeGenerator, MemoryStore, Pagination,
    ProviderService, TransactionService, DEFAULT_CODE_WIDTH,
};
use backoffice_domain::{Coded, DailyBook, Document, ObjectId, Provider};
use backoffice_storage_json::JsonDocumentStore;
use tracing::info;

use crate::errors::{BackOfficeError, Result};

/// One handle over every ledger service, sharing a single store.
#[derive(Clone)]
pub struct BackOffice {
    store: Arc<dyn DocumentStore>,
    config: Config,
    chart: ChartService,
    daily_books: DailyBookService,
    balances: BalanceService,
    transactions: TransactionService,
    providers: ProviderService,
    fiscal_years: FiscalYearService,
}

impl BackOffice {
    /// Opens (or creates) the JSON store under `data_dir`.
    pub fn open(config: Config, data_dir: &Path) -> Result<Self> {
        let store = JsonDocumentStore::open(data_dir)?;
        info!(data_dir = %data_dir.display(), "opened back office data");
        Self::with_store(Arc::new(store), config)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    pub fn with_store(store: Arc<dyn DocumentStore>, config: Config) -> Result<Self> {
        config.validate()?;

        let allocator = CodeAllocator::with_options(
            Arc::clone(&store),
            AllocatorOptions {
                max_retries: config.allocator.max_retries,
                backoff: Duration::from_millis(config.allocator.backoff_ms),
                width: DEFAULT_CODE_WIDTH,
            },
        );
        // Counters written by older data (or deleted) are re-seeded from the collections.
        allocator.initialize_counter::<DailyBook>(&config.daily_book_prefix)?;
        allocator.initialize_counter::<Provider>(&config.provider_prefix)?;

        let strategy = match config.hierarchy.strategy {
            HierarchyStrategy::Atomic => CodeStrategy::Atomic,
            HierarchyStrategy::ReadMax => CodeStrategy::ReadMax,
        };
        let codes = HierarchyCodeGenerator::new(Arc::clone(&store), allocator.clone(), strategy);
        let daily_books = DailyBookService::new(
            Arc::clone(&store),
            allocator.clone(),
            config.daily_book_prefix.clone(),
        );

        Ok(Self {
            chart: ChartService::new(Arc::clone(&store), codes),
            balances: BalanceService::new(Arc::clone(&store)),
            transactions: TransactionService::new(Arc::clone(&store), daily_books.clone()),
            providers: ProviderService::new(
                Arc::clone(&store),
                allocator,
                config.provider_prefix.clone(),
            ),
            fiscal_years: FiscalYearService::new(Arc::clone(&store)),
            daily_books,
            store,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn chart(&self) -> &ChartService {
        &self.chart
    }

    pub fn daily_books(&self) -> &DailyBookService {
        &self.daily_books
    }

    pub fn balances(&self) -> &BalanceService {
        &self.balances
    }

    pub fn transactions(&self) -> &TransactionService {
        &self.transactions
    }

    pub fn providers(&self) -> &ProviderService {
        &self.providers
    }

    pub fn fiscal_years(&self) -> &FiscalYearService {
        &self.fiscal_years
    }

    /// Pagination bounded by the configured limits.
    pub fn pagination(&self, page: Option<&str>, limit: Option<&str>) -> Result<Pagination> {
        let settings = &self.config.pagination;
        Ok(Pagination::parse_with(
            page,
            limit,
            settings.default_limit,
            settings.max_limit,
        )?)
    }

    /// Looks a document up by its code or, failing that, by its 24-hex id.
    pub fn resolve<D: Document + Coded>(&self, token: &str) -> Result<D> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BackOfficeError::InvalidInput(format!(
                "{} reference must not be empty",
                D::MODEL
            )));
        }
        if let Some(found) = self.store.find_one::<D>(&Filter::eq(D::CODE_FIELD, token))? {
            return Ok(found);
        }
        match ObjectId::parse_str(token) {
            Ok(id) => self
                .store
                .get_doc::<D>(id)?
                .ok_or_else(|| CoreError::not_found(D::MODEL, token).into()),
            Err(_) => Err(CoreError::not_found(D::MODEL, token).into()),
        }
    }
}

pub fn parse_id(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw.trim()).map_err(|err| BackOfficeError::InvalidInput(err.to_string()))
}
