//! Shared runtime state for the shell and command dispatch.

use std::{io, path::PathBuf, sync::Arc};

use backoffice_config::{Config, ConfigError, ConfigManager, HierarchyStrategy};
use backoffice_core::CoreError;
use strsim::levenshtein;
use tracing::debug;

use crate::{
    app::BackOffice,
    cli::{
        commands,
        output::{self, OutputPreferences},
        registry::{CommandEntry, CommandRegistry},
    },
    errors::{BackOfficeError, CliError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Core(#[from] BackOfficeError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<CoreError> for CommandError {
    fn from(err: CoreError) -> Self {
        CommandError::Core(err.into())
    }
}

impl From<ConfigError> for CommandError {
    fn from(err: ConfigError) -> Self {
        CommandError::Core(err.into())
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Core(inner) => CliError::Core(inner),
            CommandError::InvalidArguments(message) => CliError::Input(message),
            other => CliError::Command(other.to_string()),
        }
    }
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub office: BackOffice,
    pub config_manager: ConfigManager,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    /// Loads config from the base directory and opens the data store it names.
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let config_manager = ConfigManager::from_env()?;
        let config = config_manager.load()?;
        crate::init_with_filter(&config.log_filter);
        let data_dir = config_manager.data_dir(&config);
        let office = BackOffice::open(config, &data_dir)?;
        Ok(Self::with_office(mode, office, config_manager))
    }

    pub fn with_office(mode: CliMode, office: BackOffice, config_manager: ConfigManager) -> Self {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);
        apply_output(mode, office.config());
        Self {
            mode,
            registry,
            office,
            config_manager,
            last_command: None,
            running: true,
        }
    }

    pub fn config(&self) -> &Config {
        self.office.config()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.config_manager.data_dir(self.config())
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn command_usages(&self) -> Vec<(&'static str, &'static str)> {
        self.registry
            .list()
            .into_iter()
            .map(|entry| (entry.name, entry.usage))
            .collect()
    }

    pub(crate) fn history_path(&self) -> PathBuf {
        self.config_manager.base_dir().join("history.txt")
    }

    pub(crate) fn prompt(&self) -> String {
        "backoffice> ".to_string()
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{input}`. Type `help` to see available commands."
        ));

        let needle = input.to_lowercase();
        let best = self
            .registry
            .names()
            .map(|name| (levenshtein(name, &needle), name))
            .min_by_key(|(distance, _)| *distance);

        if let Some((distance, name)) = best {
            if distance <= 3 {
                output::info(format!("Suggestion: `{name}`?"));
            }
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(dialoguer::Confirm::new()
            .with_prompt("Exit shell?")
            .default(false)
            .interact()?)
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        debug!(
            command = self.last_command.as_deref().unwrap_or_default(),
            error = %err,
            "command failed"
        );
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
                Ok(())
            }
            CommandError::Core(err @ BackOfficeError::NotFound { .. }) => {
                output::error(err);
                output::hint("Accounts can be referenced by code; `chart` lists them.");
                Ok(())
            }
            CommandError::Core(err @ BackOfficeError::Integrity(_)) => {
                output::error(err);
                output::hint("Remove the dependent records first.");
                Ok(())
            }
            other => {
                output::error(other);
                Ok(())
            }
        }
    }

    /// Validates and saves `config`, then rebuilds the services around the same store.
    pub(crate) fn replace_config(&mut self, config: Config) -> CommandResult {
        config.validate()?;
        let office = BackOffice::with_store(Arc::clone(self.office.store()), config)?;
        self.config_manager.save(office.config())?;
        apply_output(self.mode, office.config());
        self.office = office;
        Ok(())
    }

    pub(crate) fn set_config_value(&mut self, key: &str, value: &str) -> CommandResult {
        let mut config = self.config().clone();
        match key.to_lowercase().replace('-', "_").as_str() {
            "log_filter" => config.log_filter = value.to_string(),
            "strategy" | "hierarchy.strategy" => {
                config.hierarchy.strategy = HierarchyStrategy::parse(value)
            }
            "max_retries" | "allocator.max_retries" => {
                config.allocator.max_retries = parse_setting(key, value)?
            }
            "backoff_ms" | "allocator.backoff_ms" => {
                config.allocator.backoff_ms = parse_setting(key, value)?
            }
            "default_limit" | "pagination.default_limit" => {
                config.pagination.default_limit = parse_setting(key, value)?
            }
            "max_limit" | "pagination.max_limit" => {
                config.pagination.max_limit = parse_setting(key, value)?
            }
            "daily_book_prefix" => config.daily_book_prefix = value.trim().to_string(),
            "provider_prefix" => config.provider_prefix = value.trim().to_string(),
            "ui_color_enabled" | "color" => config.ui_color_enabled = parse_setting(key, value)?,
            "data_dir" => {
                config.data_dir = if value.eq_ignore_ascii_case("default") || value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
                output::warning("The data directory change applies on the next start.");
            }
            other => {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown config key `{other}`"
                )))
            }
        }
        self.replace_config(config)
    }
}

fn parse_setting<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, CommandError> {
    value
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidArguments(format!("invalid value `{value}` for `{key}`")))
}

fn apply_output(mode: CliMode, config: &Config) {
    output::set_preferences(OutputPreferences {
        color: config.ui_color_enabled && mode == CliMode::Interactive,
        quiet: false,
    });
}

#[cfg(test)]
impl ShellContext {
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        crate::cli::shell::handle_line(self, line)
    }
}

#[cfg(test)]
pub(crate) fn script_context(base: &std::path::Path) -> ShellContext {
    let manager = ConfigManager::with_base_dir(base.to_path_buf()).expect("config manager");
    let office = BackOffice::in_memory(Config::default()).expect("office");
    ShellContext::with_office(CliMode::Script, office, manager)
}
