use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{CommandError, CommandResult, ShellContext};
use crate::utils::build_info;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("help", "Show available commands", "help [command]", cmd_help),
        CommandEntry::new("version", "Show build metadata", "version", cmd_version),
        CommandEntry::new(
            "config",
            "Show or change settings",
            "config [show | set <key> <value>]",
            cmd_config,
        ),
        CommandEntry::new("exit", "Exit the shell", "exit", cmd_exit),
    ]
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(name) = args.first() {
        match context.command(&name.to_lowercase()) {
            Some(entry) => {
                output::section(format!("Help: {}", entry.name));
                output::info(format!("  Description: {}", entry.description));
                output::info(format!("  Usage: {}", entry.usage));
            }
            None => context.suggest_command(name),
        }
        return Ok(());
    }

    output::section("Available commands");
    for entry in context.registry.list() {
        output::info(format!("  {:<16} {}", entry.name, entry.description));
    }
    output::info("Use `help <command>` for details.");
    Ok(())
}

fn cmd_version(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    output::section(format!("Back Office {}", meta.version));
    for (name, value) in meta.fields() {
        output::info(format!("  {name:<8}: {value}"));
    }
    Ok(())
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first().map(|sub| sub.to_lowercase()).as_deref() {
        None | Some("show") => {
            let config = context.config();
            output::section("Configuration");
            output::info(format!(
                "  Config file      : {}",
                context.config_manager.config_path().display()
            ));
            output::info(format!("  Data directory   : {}", context.data_dir().display()));
            output::info(format!("  Log filter       : {}", config.log_filter));
            output::info(format!("  Code strategy    : {}", config.hierarchy.strategy));
            output::info(format!(
                "  Allocator        : {} retries, {} ms backoff",
                config.allocator.max_retries, config.allocator.backoff_ms
            ));
            output::info(format!(
                "  Page size        : {} (max {})",
                config.pagination.default_limit, config.pagination.max_limit
            ));
            output::info(format!("  Entry prefix     : {}", config.daily_book_prefix));
            output::info(format!("  Provider prefix  : {}", config.provider_prefix));
            output::info(format!("  Color            : {}", config.ui_color_enabled));
            Ok(())
        }
        Some("set") => {
            let (Some(key), Some(value)) = (args.get(1), args.get(2)) else {
                return Err(CommandError::InvalidArguments(
                    "usage: config set <key> <value>".into(),
                ));
            };
            context.set_config_value(key, value)?;
            output::success(format!("Set `{key}` to `{value}`."));
            Ok(())
        }
        Some(other) => Err(CommandError::InvalidArguments(format!(
            "unknown config subcommand `{other}`"
        ))),
    }
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
