//! Page/limit handling shared by list operations.

use serde::Serialize;

use crate::{CoreError, CoreResult};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: u64, limit: u64) -> CoreResult<Self> {
        Self::bounded(page, limit, MAX_LIMIT)
    }

    pub fn bounded(page: u64, limit: u64, max_limit: u64) -> CoreResult<Self> {
        if page < 1 {
            return Err(CoreError::Validation("page must be at least 1".into()));
        }
        if limit < 1 || limit > max_limit {
            return Err(CoreError::Validation(format!(
                "limit must be between 1 and {max_limit}"
            )));
        }
        Ok(Self { page, limit })
    }

    /// Parses raw query parameters, falling back to defaults when absent.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> CoreResult<Self> {
        Self::parse_with(page, limit, DEFAULT_LIMIT, MAX_LIMIT)
    }

    pub fn parse_with(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: u64,
        max_limit: u64,
    ) -> CoreResult<Self> {
        let page = parse_number("page", page)?.unwrap_or(DEFAULT_PAGE);
        let limit = parse_number("limit", limit)?.unwrap_or(default_limit);
        Self::bounded(page, limit, max_limit)
    }

    pub fn skip(&self) -> usize {
        ((self.page - 1) * self.limit) as usize
    }
}

fn parse_number(name: &str, raw: Option<&str>) -> CoreResult<Option<u64>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| CoreError::Validation(format!("{name} must be a positive integer"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u64,
    pub limit: u64,
    pub total: usize,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: usize) -> Self {
        let total_pages = (total as u64).div_ceil(pagination.limit);
        Self {
            items,
            pagination: PageMeta {
                page: pagination.page,
                limit: pagination.limit,
                total,
                total_pages,
            },
        }
    }
}
