//! Journal entry creation, lookup and removal.

use std::{collections::HashSet, sync::Arc};

use backoffice_domain::{DailyBook, DailyBookDraft, DetailedAccount, HierarchyLevel, ObjectId, Transaction};
use chrono::NaiveDate;
use serde_json::Value as Json;
use tracing::{info, warn};

use crate::{
    counter_service::CodeAllocator,
    pagination::{Page, Pagination},
    store::{DocumentStore, Filter, FindOptions, SortOrder, StoreExt},
    CoreError, CoreResult,
};

pub const DEFAULT_DAILY_BOOK_PREFIX: &str = "AS";

const ENTRY_ACCOUNT_PATHS: [&str; 4] = [
    "debitEntries.detailed1",
    "debitEntries.detailed2",
    "creditEntries.detailed1",
    "creditEntries.detailed2",
];

/// Matches daily books with any line referencing one of `accounts`.
pub fn entries_touching<'a>(accounts: impl IntoIterator<Item = &'a ObjectId>) -> Filter {
    let values: Vec<Json> = accounts
        .into_iter()
        .map(|id| Json::String(id.to_hex()))
        .collect();
    Filter::Or(
        ENTRY_ACCOUNT_PATHS
            .iter()
            .map(|path| Filter::In(path.to_string(), values.clone()))
            .collect(),
    )
}

#[derive(Clone)]
pub struct DailyBookService {
    store: Arc<dyn DocumentStore>,
    allocator: CodeAllocator,
    prefix: String,
}

impl DailyBookService {
    pub fn new(store: Arc<dyn DocumentStore>, allocator: CodeAllocator, prefix: impl Into<String>) -> Self {
        Self {
            store,
            allocator,
            prefix: prefix.into(),
        }
    }

    /// Validates the lines and stores the entry, allocating a document number when absent.
    pub fn create(&self, draft: DailyBookDraft) -> CoreResult<DailyBook> {
        self.validate(&draft)?;
        let document_number = match draft.document_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => {
                if self
                    .store
                    .count_docs::<DailyBook>(&Filter::eq("documentNumber", number))?
                    > 0
                {
                    return Err(CoreError::Conflict(format!(
                        "document number `{number}` already exists"
                    )));
                }
                number.to_string()
            }
            _ => self.allocator.next_code::<DailyBook>(&self.prefix)?,
        };
        let book = DailyBook::from_draft(document_number, draft);
        if !book.is_balanced() {
            warn!(
                document = %book.document_number,
                debit = book.total_debit(),
                credit = book.total_credit(),
                "daily book entry is not balanced"
            );
        }
        self.store.insert_doc(&book)?;
        info!(id = %book.id, document = %book.document_number, "daily book created");
        Ok(book)
    }

    pub fn get(&self, id: ObjectId) -> CoreResult<DailyBook> {
        self.store
            .get_doc::<DailyBook>(id)?
            .ok_or_else(|| CoreError::not_found("daily book", id))
    }

    /// Lists entries by date, optionally restricted to an inclusive date range.
    pub fn list(
        &self,
        pagination: Pagination,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> CoreResult<Page<DailyBook>> {
        let filter = match range {
            Some((from, to)) => {
                if to < from {
                    return Err(CoreError::Validation(
                        "date range end must not precede its start".into(),
                    ));
                }
                Filter::Range {
                    path: "date".into(),
                    gte: Some(Json::String(from.to_string())),
                    lte: Some(Json::String(to.to_string())),
                }
            }
            None => Filter::All,
        };
        let mut options = FindOptions::sorted("date", SortOrder::Ascending);
        options
            .sort
            .push(("documentNumber".into(), SortOrder::Ascending));
        self.store.find_page(&filter, options, pagination)
    }

    /// Removes an entry unless a transaction is linked to it.
    pub fn delete(&self, id: ObjectId) -> CoreResult<()> {
        let linked = self
            .store
            .count_docs::<Transaction>(&Filter::eq("dailyBook", id))?;
        if linked > 0 {
            return Err(CoreError::Integrity(format!(
                "daily book {id} is linked to {linked} transaction(s)"
            )));
        }
        if !self.store.delete_doc::<DailyBook>(id)? {
            return Err(CoreError::not_found("daily book", id));
        }
        info!(%id, "daily book deleted");
        Ok(())
    }

    fn validate(&self, draft: &DailyBookDraft) -> CoreResult<()> {
        if draft.debit_entries.is_empty() && draft.credit_entries.is_empty() {
            return Err(CoreError::Validation(
                "a daily book entry needs at least one line".into(),
            ));
        }
        if let Some(line) = draft
            .lines()
            .find(|line| !line.amount.is_finite() || line.amount <= 0.0)
        {
            return Err(CoreError::Validation(format!(
                "line amounts must be positive, got {}",
                line.amount
            )));
        }
        let referenced: HashSet<ObjectId> = draft.lines().flat_map(|line| line.accounts()).collect();
        let existing: HashSet<ObjectId> = self
            .store
            .find_docs::<DetailedAccount>(
                &Filter::is_in("_id", referenced.iter().copied()),
                &FindOptions::default(),
            )?
            .into_iter()
            .map(|account| account.id)
            .collect();
        if let Some(missing) = referenced.difference(&existing).next() {
            return Err(CoreError::not_found(HierarchyLevel::DetailedAccount, missing));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use backoffice_domain::EntryLine;

    fn service_with_account() -> (DailyBookService, DetailedAccount) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let account = DetailedAccount::new("00000001", "Cash");
        store.insert_doc(&account).unwrap();
        let allocator = CodeAllocator::new(store.clone());
        (
            DailyBookService::new(store, allocator, DEFAULT_DAILY_BOOK_PREFIX),
            account,
        )
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn create_allocates_document_numbers() {
        let (service, account) = service_with_account();
        let draft = DailyBookDraft::new(date(5), "Opening")
            .debit(EntryLine::new(account.id, 100.0))
            .credit(EntryLine::new(account.id, 100.0));
        let first = service.create(draft.clone()).unwrap();
        let second = service.create(draft).unwrap();
        assert_eq!(first.document_number, "AS0001");
        assert_eq!(second.document_number, "AS0002");
    }

    #[test]
    fn explicit_document_numbers_must_be_unique() {
        let (service, account) = service_with_account();
        let mut draft = DailyBookDraft::new(date(5), "Manual").debit(EntryLine::new(account.id, 1.0));
        draft.document_number = Some("M-1".into());
        service.create(draft.clone()).unwrap();
        assert!(matches!(service.create(draft), Err(CoreError::Conflict(_))));
    }

    #[test]
    fn unknown_accounts_and_bad_amounts_are_rejected() {
        let (service, account) = service_with_account();
        let unknown = DailyBookDraft::new(date(5), "x").debit(EntryLine::new(ObjectId::new(), 1.0));
        assert!(matches!(service.create(unknown), Err(CoreError::NotFound { .. })));

        let negative = DailyBookDraft::new(date(5), "x").debit(EntryLine::new(account.id, -3.0));
        assert!(matches!(service.create(negative), Err(CoreError::Validation(_))));

        let empty = DailyBookDraft::new(date(5), "x");
        assert!(matches!(service.create(empty), Err(CoreError::Validation(_))));
    }

    #[test]
    fn list_filters_by_date_range() {
        let (service, account) = service_with_account();
        for day in [2, 10, 20] {
            service
                .create(DailyBookDraft::new(date(day), "entry").debit(EntryLine::new(account.id, 5.0)))
                .unwrap();
        }
        let page = service
            .list(Pagination::default(), Some((date(5), date(20))))
            .unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.items[0].date, date(10));
    }

    #[test]
    fn delete_removes_unlinked_entries() {
        let (service, account) = service_with_account();
        let book = service
            .create(DailyBookDraft::new(date(1), "entry").debit(EntryLine::new(account.id, 5.0)))
            .unwrap();
        service.delete(book.id).unwrap();
        assert!(matches!(service.get(book.id), Err(CoreError::NotFound { .. })));
        assert!(matches!(service.delete(book.id), Err(CoreError::NotFound { .. })));
    }
}
