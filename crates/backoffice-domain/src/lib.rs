//! backoffice-domain
//!
//! Pure domain models (chart of accounts, daily book, transactions, providers).
//! No I/O, no storage. Only data types, identifiers and core enums.

pub mod chart;
pub mod common;
pub mod counter;
pub mod daily_book;
pub mod fiscal_year;
pub mod provider;
pub mod transaction;

pub use chart::*;
pub use common::*;
pub use counter::*;
pub use daily_book::*;
pub use fiscal_year::*;
pub use provider::*;
pub use transaction::*;
