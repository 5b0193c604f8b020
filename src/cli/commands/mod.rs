use std::collections::HashMap;

use backoffice_core::{Page, Pagination};
use chrono::NaiveDate;

pub mod chart;
pub mod fiscal;
pub mod journal;
pub mod provider;
pub mod system;

use crate::cli::output;
use crate::cli::registry::CommandRegistry;
use crate::cli::shell_context::{CommandError, ShellContext};

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    registry.extend(system::definitions());
    registry.extend(chart::definitions());
    registry.extend(journal::definitions());
    registry.extend(provider::definitions());
    registry.extend(fiscal::definitions());
}

/// Positional arguments plus `--name value` options.
#[derive(Debug, Default)]
pub(crate) struct Args<'a> {
    positional: Vec<&'a str>,
    options: HashMap<&'a str, &'a str>,
}

impl<'a> Args<'a> {
    /// Splits `raw`, accepting only the option names in `allowed`.
    pub(crate) fn parse(raw: &[&'a str], allowed: &[&str]) -> Result<Self, CommandError> {
        let mut args = Args::default();
        let mut iter = raw.iter().copied();
        while let Some(token) = iter.next() {
            let Some(name) = token.strip_prefix("--") else {
                args.positional.push(token);
                continue;
            };
            if !allowed.contains(&name) {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown option `--{name}`"
                )));
            }
            let value = iter.next().ok_or_else(|| {
                CommandError::InvalidArguments(format!("option `--{name}` needs a value"))
            })?;
            args.options.insert(name, value);
        }
        Ok(args)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&'a str> {
        self.positional.get(index).copied()
    }

    pub(crate) fn required(&self, index: usize, usage: &str) -> Result<&'a str, CommandError> {
        self.get(index)
            .ok_or_else(|| CommandError::InvalidArguments(format!("usage: {usage}")))
    }

    /// Positionals from `index` on, joined by spaces.
    pub(crate) fn rest(&self, index: usize) -> Option<String> {
        let rest = self.positional.get(index..)?;
        (!rest.is_empty()).then(|| rest.join(" "))
    }

    pub(crate) fn option(&self, name: &str) -> Option<&'a str> {
        self.options.get(name).copied()
    }

    pub(crate) fn date_option(&self, name: &str) -> Result<Option<NaiveDate>, CommandError> {
        self.option(name).map(parse_date).transpose()
    }

    pub(crate) fn pagination(&self, context: &ShellContext) -> Result<Pagination, CommandError> {
        Ok(context
            .office
            .pagination(self.option("page"), self.option("limit"))?)
    }
}

pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("invalid date `{input}` (use YYYY-MM-DD)"))
    })
}

pub(crate) fn parse_amount(input: &str) -> Result<f64, CommandError> {
    match input.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(CommandError::InvalidArguments(format!(
            "amount must be a positive number, got `{input}`"
        ))),
    }
}

pub(crate) fn print_page_footer<T>(page: &Page<T>) {
    let meta = page.pagination;
    output::info(format!(
        "Page {}/{} ({} total)",
        meta.page,
        meta.total_pages.max(1),
        meta.total
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_positionals_and_options() {
        let raw = ["Cash", "Bank", "--date", "2024-03-01", "rent", "march"];
        let args = Args::parse(&raw, &["date"]).expect("args");

        assert_eq!(args.get(1), Some("Bank"));
        assert_eq!(args.get(3), Some("march"));
        assert_eq!(args.get(4), None);
        assert_eq!(args.rest(2).as_deref(), Some("rent march"));
        assert_eq!(args.rest(4), None);
        assert_eq!(
            args.date_option("date").expect("date"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn rejects_unknown_or_dangling_options() {
        assert!(Args::parse(&["--colour", "red"], &["date"]).is_err());
        assert!(Args::parse(&["--date"], &["date"]).is_err());
    }

    #[test]
    fn amounts_must_be_positive() {
        assert_eq!(parse_amount("12.5").expect("amount"), 12.5);
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-3").is_err());
        assert!(parse_amount("NaN").is_err());
    }
}
