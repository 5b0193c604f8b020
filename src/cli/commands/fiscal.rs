use backoffice_core::store::{Filter, StoreExt};
use backoffice_domain::FiscalYear;

use super::{parse_date, print_page_footer, Args};
use crate::app::parse_id;
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{CommandError, CommandResult, ShellContext};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "year",
            "Open a fiscal year",
            "year <name> <start YYYY-MM-DD> <end YYYY-MM-DD>",
            cmd_year,
        ),
        CommandEntry::new(
            "years",
            "List fiscal years, most recent first",
            "years [--page <n>] [--limit <n>]",
            cmd_years,
        ),
        CommandEntry::new("year-close", "Close a fiscal year", "year-close <name>", cmd_year_close),
    ]
}

/// Fiscal years have no code; they are looked up by name, then by id.
fn find_year(context: &ShellContext, reference: &str) -> Result<FiscalYear, CommandError> {
    let store = context.office.store();
    if let Some(year) = store.find_one::<FiscalYear>(&Filter::eq("name", reference.trim()))? {
        return Ok(year);
    }
    let id = parse_id(reference).map_err(|_| {
        CommandError::InvalidArguments(format!("no fiscal year named `{reference}`"))
    })?;
    Ok(context.office.fiscal_years().get(id)?)
}

fn cmd_year(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    const USAGE: &str = "year <name> <start> <end>";
    let args = Args::parse(raw, &[])?;
    let name = args.required(0, USAGE)?;
    let start = parse_date(args.required(1, USAGE)?)?;
    let end = parse_date(args.required(2, USAGE)?)?;
    let year = context.office.fiscal_years().create(name, start, end)?;
    output::success(format!(
        "Opened fiscal year {} ({} to {}).",
        year.name, year.start, year.end
    ));
    Ok(())
}

fn cmd_years(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &["page", "limit"])?;
    let page = context
        .office
        .fiscal_years()
        .list(args.pagination(context)?)?;

    if page.items.is_empty() {
        output::info("No fiscal years.");
    } else {
        let rows: Vec<Vec<String>> = page
            .items
            .iter()
            .map(|year| {
                vec![
                    year.name.clone(),
                    year.start.to_string(),
                    year.end.to_string(),
                    if year.closed { "closed" } else { "open" }.to_string(),
                ]
            })
            .collect();
        output::print_table(&["Name", "Start", "End", "Status"], &rows);
    }
    print_page_footer(&page);
    Ok(())
}

fn cmd_year_close(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &[])?;
    let year = find_year(context, args.required(0, "year-close <name>")?)?;
    let closed = context.office.fiscal_years().close(year.id)?;
    output::success(format!("Closed fiscal year {}.", closed.name));
    Ok(())
}
