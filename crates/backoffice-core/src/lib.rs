//! backoffice-core
//!
//! Business logic and services for the back office ledger.
//! Depends on backoffice-domain. Persistence goes through the [`store::DocumentStore`] trait;
//! no terminal I/O and no direct file access.

pub mod balance_service;
pub mod chart_service;
pub mod code_service;
pub mod counter_service;
pub mod daily_book_service;
pub mod error;
pub mod fiscal_year_service;
pub mod memory_store;
pub mod pagination;
pub mod provider_service;
pub mod public_api;
pub mod store;
pub mod transaction_service;

pub use balance_service::*;
pub use chart_service::*;
pub use code_service::*;
pub use counter_service::*;
pub use daily_book_service::*;
pub use error::{CoreError, CoreResult};
pub use fiscal_year_service::*;
pub use memory_store::MemoryStore;
pub use pagination::*;
pub use provider_service::*;
pub use public_api::ApiResponse;
pub use transaction_service::*;

#[cfg(test)]
mod test_support;
