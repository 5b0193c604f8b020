use backoffice_domain::{Provider, ProviderDraft};

use super::{print_page_footer, Args};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{CommandError, CommandResult, ShellContext};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "provider",
            "Register a provider",
            "provider <name> <tax-id> [--email <address>]",
            cmd_provider,
        ),
        CommandEntry::new(
            "providers",
            "List providers, optionally matching name or tax id",
            "providers [search] [--page <n>] [--limit <n>]",
            cmd_providers,
        ),
        CommandEntry::new(
            "provider-update",
            "Replace a provider's name, tax id and email",
            "provider-update <code> <name> <tax-id> [--email <address>]",
            cmd_provider_update,
        ),
        CommandEntry::new(
            "provider-delete",
            "Delete a provider",
            "provider-delete <code>",
            cmd_provider_delete,
        ),
    ]
}

fn draft_from(args: &Args<'_>, offset: usize, usage: &str) -> Result<ProviderDraft, CommandError> {
    let mut draft = ProviderDraft::new(
        args.required(offset, usage)?,
        args.required(offset + 1, usage)?,
    );
    draft.email = args.option("email").map(str::to_string);
    Ok(draft)
}

fn cmd_provider(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &["email"])?;
    let draft = draft_from(&args, 0, "provider <name> <tax-id>")?;
    let provider = context.office.providers().create(draft)?;
    output::success(format!(
        "Registered provider {} {} ({}).",
        provider.code, provider.name, provider.tax_id
    ));
    Ok(())
}

fn cmd_providers(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &["page", "limit"])?;
    let search = args.rest(0);
    let page = context
        .office
        .providers()
        .list(args.pagination(context)?, search.as_deref())?;

    if page.items.is_empty() {
        output::info("No providers.");
    } else {
        let rows: Vec<Vec<String>> = page
            .items
            .iter()
            .map(|provider| {
                vec![
                    provider.code.clone(),
                    provider.name.clone(),
                    provider.tax_id.clone(),
                    provider.email.clone().unwrap_or_default(),
                ]
            })
            .collect();
        output::print_table(&["Code", "Name", "Tax id", "Email"], &rows);
    }
    print_page_footer(&page);
    Ok(())
}

fn cmd_provider_update(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    const USAGE: &str = "provider-update <code> <name> <tax-id>";
    let args = Args::parse(raw, &["email"])?;
    let provider: Provider = context.office.resolve(args.required(0, USAGE)?)?;
    let draft = draft_from(&args, 1, USAGE)?;
    let updated = context.office.providers().update(provider.id, draft)?;
    output::success(format!("Updated provider {} {}.", updated.code, updated.name));
    Ok(())
}

fn cmd_provider_delete(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &[])?;
    let provider: Provider = context
        .office
        .resolve(args.required(0, "provider-delete <code>")?)?;
    context.office.providers().delete(provider.id)?;
    output::success(format!("Deleted provider {}.", provider.code));
    Ok(())
}
