#![doc(test(attr(deny(warnings))))]

//! Back office ledger: chart of accounts, journal entries, balances and
//! payment processing over a JSON document store, plus an operator shell.

pub mod app;
pub mod cli;
pub mod errors;
pub mod utils;

pub use app::BackOffice;
pub use errors::{BackOfficeError, CliError, Result};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default directive.
pub fn init() {
    init_with_filter(utils::DEFAULT_LOG_DIRECTIVE);
}

/// Initializes global tracing once; later calls are ignored.
pub fn init_with_filter(directive: &str) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(directive);
        tracing::info!("Back office tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init_with_filter("backoffice=debug");
    }
}
