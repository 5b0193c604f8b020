use backoffice_core::Page;
use backoffice_domain::{AccountGroup, DetailedAccount, FixedAccount, HierarchyLevel, TotalAccount};

use super::{print_page_footer, Args};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{CommandError, CommandResult, ShellContext};

const LEVELS: &str = "group|total|fixed|detailed";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("group", "Create an account group", "group <name>", cmd_group),
        CommandEntry::new(
            "total",
            "Create a total account under a group",
            "total <group> <name>",
            cmd_total,
        ),
        CommandEntry::new(
            "fixed",
            "Create a fixed account under a total account",
            "fixed <total> <name>",
            cmd_fixed,
        ),
        CommandEntry::new(
            "detailed",
            "Create a detailed account under a fixed account",
            "detailed <fixed> <name>",
            cmd_detailed,
        ),
        CommandEntry::new("chart", "Print the chart of accounts", "chart", cmd_chart),
        CommandEntry::new(
            "accounts",
            "List accounts of one level",
            "accounts <group|total|fixed|detailed> [--name <text>] [--page <n>] [--limit <n>]",
            cmd_accounts,
        ),
        CommandEntry::new(
            "rename",
            "Rename an account",
            "rename <group|total|fixed|detailed> <code> <name>",
            cmd_rename,
        ),
        CommandEntry::new(
            "delete",
            "Delete an account without dependants",
            "delete <group|total|fixed|detailed> <code>",
            cmd_delete,
        ),
    ]
}

fn usage(text: &str) -> CommandError {
    CommandError::InvalidArguments(format!("usage: {text}"))
}

fn parse_level(raw: &str) -> Result<HierarchyLevel, CommandError> {
    match raw.to_lowercase().as_str() {
        "group" | "groups" => Ok(HierarchyLevel::AccountGroup),
        "total" | "totals" => Ok(HierarchyLevel::TotalAccount),
        "fixed" => Ok(HierarchyLevel::FixedAccount),
        "detailed" => Ok(HierarchyLevel::DetailedAccount),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown level `{other}` (use {LEVELS})"
        ))),
    }
}

fn cmd_group(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &[])?;
    let name = args.rest(0).ok_or_else(|| usage("group <name>"))?;
    let group = context.office.chart().create_group(&name)?;
    output::success(format!("Created account group {} {}.", group.code, group.name));
    Ok(())
}

fn cmd_total(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    const USAGE: &str = "total <group> <name>";
    let args = Args::parse(raw, &[])?;
    let group: AccountGroup = context.office.resolve(args.required(0, USAGE)?)?;
    let name = args.rest(1).ok_or_else(|| usage(USAGE))?;
    let total = context.office.chart().create_total(group.id, &name)?;
    output::success(format!("Created total account {} {}.", total.code, total.name));
    Ok(())
}

fn cmd_fixed(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    const USAGE: &str = "fixed <total> <name>";
    let args = Args::parse(raw, &[])?;
    let total: TotalAccount = context.office.resolve(args.required(0, USAGE)?)?;
    let name = args.rest(1).ok_or_else(|| usage(USAGE))?;
    let fixed = context.office.chart().create_fixed(total.id, &name)?;
    output::success(format!("Created fixed account {} {}.", fixed.code, fixed.name));
    Ok(())
}

fn cmd_detailed(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    const USAGE: &str = "detailed <fixed> <name>";
    let args = Args::parse(raw, &[])?;
    let fixed: FixedAccount = context.office.resolve(args.required(0, USAGE)?)?;
    let name = args.rest(1).ok_or_else(|| usage(USAGE))?;
    let detailed = context.office.chart().create_detailed(fixed.id, &name)?;
    output::success(format!(
        "Created detailed account {} {} under {}.",
        detailed.code, detailed.name, fixed.code
    ));
    Ok(())
}

fn cmd_chart(context: &mut ShellContext, _raw: &[&str]) -> CommandResult {
    let tree = context.office.chart().chart_tree()?;
    if tree.is_empty() {
        output::info("The chart of accounts is empty. Start with `group <name>`.");
        return Ok(());
    }

    output::section("Chart of accounts");
    for group in &tree {
        println!("{} {}", group.group.code, group.group.name);
        for total in &group.totals {
            println!("  {} {}", total.account.code, total.account.name);
            for fixed in &total.fixed {
                println!("    {} {}", fixed.account.code, fixed.account.name);
                for detailed in &fixed.detailed {
                    println!("      {} {}", detailed.code, detailed.name);
                }
            }
        }
    }
    Ok(())
}

fn show_page<T>(page: &Page<T>, headers: &[&str], row: impl Fn(&T) -> Vec<String>) {
    if page.items.is_empty() {
        output::info("No matching accounts.");
    } else {
        let rows: Vec<Vec<String>> = page.items.iter().map(row).collect();
        output::print_table(headers, &rows);
    }
    print_page_footer(page);
}

fn cmd_accounts(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &["name", "page", "limit"])?;
    let level = parse_level(args.required(0, "accounts <level>")?)?;
    let pagination = args.pagination(context)?;
    let name = args.option("name");
    let chart = context.office.chart();

    match level {
        HierarchyLevel::AccountGroup => {
            let page = chart.list_groups(pagination, name)?;
            show_page(&page, &["Code", "Name"], |group| {
                vec![group.code.clone(), group.name.clone()]
            });
        }
        HierarchyLevel::TotalAccount => {
            let page = chart.list_totals(pagination, name)?;
            show_page(&page, &["Code", "Name"], |total| {
                vec![total.code.clone(), total.name.clone()]
            });
        }
        HierarchyLevel::FixedAccount => {
            let page = chart.list_fixed(pagination, name)?;
            show_page(&page, &["Code", "Name", "Detailed"], |fixed| {
                vec![
                    fixed.code.clone(),
                    fixed.name.clone(),
                    fixed.detailed_accounts.len().to_string(),
                ]
            });
        }
        HierarchyLevel::DetailedAccount => {
            let page = chart.list_detailed(pagination, name)?;
            show_page(&page, &["Code", "Name"], |detailed| {
                vec![detailed.code.clone(), detailed.name.clone()]
            });
        }
    }
    Ok(())
}

fn cmd_rename(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    const USAGE: &str = "rename <level> <code> <name>";
    let args = Args::parse(raw, &[])?;
    let level = parse_level(args.required(0, USAGE)?)?;
    let reference = args.required(1, USAGE)?;
    let name = args.rest(2).ok_or_else(|| usage(USAGE))?;
    let office = &context.office;
    let chart = office.chart();

    let code = match level {
        HierarchyLevel::AccountGroup => {
            let group: AccountGroup = office.resolve(reference)?;
            chart.rename_group(group.id, &name)?.code
        }
        HierarchyLevel::TotalAccount => {
            let total: TotalAccount = office.resolve(reference)?;
            chart.rename_total(total.id, &name)?.code
        }
        HierarchyLevel::FixedAccount => {
            let fixed: FixedAccount = office.resolve(reference)?;
            chart.rename_fixed(fixed.id, &name)?.code
        }
        HierarchyLevel::DetailedAccount => {
            let detailed: DetailedAccount = office.resolve(reference)?;
            chart.rename_detailed(detailed.id, &name)?.code
        }
    };
    output::success(format!("Renamed {level} {code} to {}.", name.trim()));
    Ok(())
}

fn cmd_delete(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    const USAGE: &str = "delete <level> <code>";
    let args = Args::parse(raw, &[])?;
    let level = parse_level(args.required(0, USAGE)?)?;
    let reference = args.required(1, USAGE)?;
    let office = &context.office;
    let chart = office.chart();

    let code = match level {
        HierarchyLevel::AccountGroup => {
            let group: AccountGroup = office.resolve(reference)?;
            chart.delete_group(group.id)?;
            group.code
        }
        HierarchyLevel::TotalAccount => {
            let total: TotalAccount = office.resolve(reference)?;
            chart.delete_total(total.id)?;
            total.code
        }
        HierarchyLevel::FixedAccount => {
            let fixed: FixedAccount = office.resolve(reference)?;
            chart.delete_fixed(fixed.id)?;
            fixed.code
        }
        HierarchyLevel::DetailedAccount => {
            let detailed: DetailedAccount = office.resolve(reference)?;
            chart.delete_detailed(detailed.id)?;
            detailed.code
        }
    };
    output::success(format!("Deleted {level} {code}."));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_level("Group").expect("group"), HierarchyLevel::AccountGroup);
        assert_eq!(parse_level("detailed").expect("detailed"), HierarchyLevel::DetailedAccount);
        assert!(parse_level("leaf").is_err());
    }
}
