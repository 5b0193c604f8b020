pub mod build_info;

use tracing::warn;
use tracing_subscriber::{
    filter::{Directive, LevelFilter},
    fmt, EnvFilter,
};

pub const DEFAULT_LOG_DIRECTIVE: &str = "backoffice=info";

/// Installs the global subscriber writing to stderr.
///
/// `RUST_LOG` is honoured first; `directive` is layered on top. An unparsable
/// directive falls back to [`DEFAULT_LOG_DIRECTIVE`].
pub fn init_tracing(directive: &str) {
    let (parsed, rejected) = match directive.parse::<Directive>() {
        Ok(parsed) => (parsed, false),
        Err(_) => (default_directive(), true),
    };
    let filter = EnvFilter::from_default_env().add_directive(parsed);
    if fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        return;
    }
    if rejected {
        warn!(directive, "ignoring invalid log filter");
    }
}

fn default_directive() -> Directive {
    DEFAULT_LOG_DIRECTIVE
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into())
}
