use std::sync::Arc;

use backoffice_domain::{FiscalYear, ObjectId};
use chrono::NaiveDate;
use serde_json::Value as Json;
use tracing::info;

use crate::{
    pagination::{Page, Pagination},
    store::{DocumentStore, Filter, FindOptions, SortOrder, StoreExt},
    CoreError, CoreResult,
};

#[derive(Clone)]
pub struct FiscalYearService {
    store: Arc<dyn DocumentStore>,
}

impl FiscalYearService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn create(&self, name: &str, start: NaiveDate, end: NaiveDate) -> CoreResult<FiscalYear> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("fiscal year name must not be empty".into()));
        }
        if end < start {
            return Err(CoreError::Validation(format!(
                "fiscal year `{name}` ends ({end}) before it starts ({start})"
            )));
        }
        if self.store.count_docs::<FiscalYear>(&Filter::eq("name", name))? > 0 {
            return Err(CoreError::Conflict(format!(
                "fiscal year `{name}` already exists"
            )));
        }
        let year = FiscalYear::new(name, start, end);
        self.store.insert_doc(&year)?;
        info!(id = %year.id, name = %year.name, "fiscal year created");
        Ok(year)
    }

    pub fn get(&self, id: ObjectId) -> CoreResult<FiscalYear> {
        self.store
            .get_doc::<FiscalYear>(id)?
            .ok_or_else(|| CoreError::not_found("fiscal year", id))
    }

    pub fn close(&self, id: ObjectId) -> CoreResult<FiscalYear> {
        let mut year = self.get(id)?;
        if year.closed {
            return Err(CoreError::Conflict(format!(
                "fiscal year `{}` is already closed",
                year.name
            )));
        }
        year.closed = true;
        self.store.replace_doc(&year)?;
        info!(%id, name = %year.name, "fiscal year closed");
        Ok(year)
    }

    /// Most recent first.
    pub fn list(&self, pagination: Pagination) -> CoreResult<Page<FiscalYear>> {
        self.store.find_page(
            &Filter::All,
            FindOptions::sorted("start", SortOrder::Descending),
            pagination,
        )
    }

    /// The open fiscal year covering `date`, if any.
    pub fn open_year_for(&self, date: NaiveDate) -> CoreResult<Option<FiscalYear>> {
        let day = Json::String(date.to_string());
        let filter = Filter::eq("closed", false)
            .and(Filter::Range {
                path: "start".into(),
                gte: None,
                lte: Some(day.clone()),
            })
            .and(Filter::Range {
                path: "end".into(),
                gte: Some(day),
                lte: None,
            });
        self.store.find_one::<FiscalYear>(&filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn service() -> FiscalYearService {
        FiscalYearService::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn names_are_unique_and_ranges_ordered() {
        let years = service();
        years.create("FY2024", ymd(2024, 1, 1), ymd(2024, 12, 31)).unwrap();
        assert!(matches!(
            years.create("FY2024", ymd(2025, 1, 1), ymd(2025, 12, 31)),
            Err(CoreError::Conflict(_))
        ));
        assert!(matches!(
            years.create("FY2026", ymd(2026, 12, 31), ymd(2026, 1, 1)),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn closing_hides_year_from_date_lookup() {
        let years = service();
        let year = years.create("FY2024", ymd(2024, 1, 1), ymd(2024, 12, 31)).unwrap();
        assert_eq!(
            years.open_year_for(ymd(2024, 6, 30)).unwrap().map(|y| y.id),
            Some(year.id)
        );
        assert!(years.open_year_for(ymd(2025, 1, 1)).unwrap().is_none());

        let closed = years.close(year.id).unwrap();
        assert!(closed.closed);
        assert!(years.open_year_for(ymd(2024, 6, 30)).unwrap().is_none());
        assert!(matches!(years.close(year.id), Err(CoreError::Conflict(_))));
    }

    #[test]
    fn list_is_newest_first() {
        let years = service();
        years.create("FY2023", ymd(2023, 1, 1), ymd(2023, 12, 31)).unwrap();
        years.create("FY2024", ymd(2024, 1, 1), ymd(2024, 12, 31)).unwrap();
        let page = years.list(Pagination::default()).unwrap();
        assert_eq!(page.items[0].name, "FY2024");
    }
}
