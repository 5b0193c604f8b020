use std::{
    borrow::Cow,
    io::{self, StdinLock},
    path::PathBuf,
};

use colored::Colorize;
use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use tracing::debug;

use crate::cli::output;
use crate::cli::shell_context::{CliMode, CommandError, LoopControl, ShellContext};
use crate::errors::CliError;

/// Commands are read from stdin without prompts when this is set.
pub const SCRIPT_ENV: &str = "BACKOFFICE_CLI_SCRIPT";

/// Commands whose first argument names a hierarchy level.
const LEVEL_COMMANDS: [&str; 3] = ["accounts", "rename", "delete"];
const LEVELS: [&str; 4] = ["group", "total", "fixed", "detailed"];

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;
    match mode {
        CliMode::Interactive => {
            let mut source = EditorSource::new(&context)?;
            output::info(format!(
                "Back office shell. Data in {}. Type `help` to begin.",
                context.data_dir().display()
            ));
            let outcome = drive(&mut context, &mut source);
            source.persist_history();
            outcome
        }
        CliMode::Script => drive(&mut context, &mut ScriptSource::new()),
    }
}

enum Input {
    Line(String),
    Interrupted,
    Closed,
}

trait LineSource {
    fn read(&mut self, prompt: &str) -> Result<Input, CliError>;

    fn remember(&mut self, _line: &str) {}
}

struct EditorSource {
    editor: Editor<CommandHelper, DefaultHistory>,
    history: PathBuf,
}

impl EditorSource {
    fn new(context: &ShellContext) -> Result<Self, CliError> {
        let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
        editor.set_helper(Some(CommandHelper::new(context.command_usages())));
        editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

        let history = context.history_path();
        if editor.load_history(&history).is_err() {
            debug!(path = %history.display(), "no shell history loaded");
        }
        Ok(Self { editor, history })
    }

    fn persist_history(&mut self) {
        if let Err(err) = self.editor.save_history(&self.history) {
            debug!(path = %self.history.display(), error = %err, "shell history not saved");
        }
    }
}

impl LineSource for EditorSource {
    fn read(&mut self, prompt: &str) -> Result<Input, CliError> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Input::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => {
                output::info("Exiting shell.");
                Ok(Input::Closed)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn remember(&mut self, line: &str) {
        self.editor.add_history_entry(line).ok();
    }
}

struct ScriptSource {
    lines: io::Lines<StdinLock<'static>>,
}

impl ScriptSource {
    fn new() -> Self {
        Self {
            lines: io::stdin().lines(),
        }
    }
}

impl LineSource for ScriptSource {
    fn read(&mut self, _prompt: &str) -> Result<Input, CliError> {
        match self.lines.next() {
            Some(line) => Ok(Input::Line(line?)),
            None => Ok(Input::Closed),
        }
    }
}

/// Feeds lines to the dispatcher until `exit`, end of input, or a confirmed interrupt.
/// Command failures are reported and the loop carries on.
fn drive(context: &mut ShellContext, source: &mut dyn LineSource) -> Result<(), CliError> {
    while context.running {
        let line = match source.read(&context.prompt())? {
            Input::Line(line) => line,
            Input::Interrupted if context.confirm_exit()? => break,
            Input::Interrupted => continue,
            Input::Closed => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        source.remember(trimmed);

        if let Err(err) = handle_line(context, trimmed) {
            context.report_error(err)?;
        }
    }
    Ok(())
}

pub(crate) fn handle_line(
    context: &mut ShellContext,
    line: &str,
) -> Result<LoopControl, CommandError> {
    let tokens = tokenize(line)?;
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    context.last_command = Some(line.to_string());

    let control = context.dispatch(&raw.to_lowercase(), raw, &args)?;
    if control == LoopControl::Exit {
        context.running = false;
    }
    Ok(control)
}

pub(crate) fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    shell_words::split(line)
        .map_err(|err| CommandError::InvalidArguments(format!("cannot parse `{line}`: {err}")))
}

struct CommandHelper {
    commands: Vec<(String, &'static str)>,
}

impl CommandHelper {
    fn new(usages: Vec<(&'static str, &'static str)>) -> Self {
        let mut commands: Vec<(String, &'static str)> = usages
            .into_iter()
            .map(|(name, usage)| (name.to_ascii_lowercase(), usage))
            .collect();
        commands.sort_by(|left, right| left.0.cmp(&right.0));
        commands.dedup_by(|left, right| left.0 == right.0);
        Self { commands }
    }

    /// Completes the command word, or the level word for commands that take one.
    fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let prefix = &line[..pos];
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let needle = prefix[start..].to_ascii_lowercase();
        let before: Vec<&str> = prefix[..start].split_whitespace().collect();

        let pool: Vec<&str> = match before.as_slice() {
            [] => self.commands.iter().map(|(name, _)| name.as_str()).collect(),
            [command] if LEVEL_COMMANDS.contains(&command.to_ascii_lowercase().as_str()) => {
                LEVELS.to_vec()
            }
            _ => Vec::new(),
        };
        let matches = pool
            .into_iter()
            .filter(|candidate| candidate.starts_with(&needle))
            .map(str::to_string)
            .collect();
        (start, matches)
    }

    /// Argument synopsis shown after a known command followed by a space.
    fn usage_hint(&self, line: &str, pos: usize) -> Option<String> {
        if pos != line.len() || !line.ends_with(' ') {
            return None;
        }
        let typed = line.trim();
        if typed.contains(char::is_whitespace) {
            return None;
        }
        let (name, usage) = self
            .commands
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(typed))?;
        let synopsis = usage.strip_prefix(name.as_str())?.trim_start();
        (!synopsis.is_empty()).then(|| synopsis.to_string())
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, words) = self.candidates(line, pos);
        let pairs = words
            .into_iter()
            .map(|word| Pair {
                display: word.clone(),
                replacement: word,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &ReadlineContext<'_>) -> Option<String> {
        self.usage_hint(line, pos)
    }
}

impl Highlighter for CommandHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.dimmed().to_string())
    }
}

impl Validator for CommandHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper() -> CommandHelper {
        CommandHelper::new(vec![
            ("balance", "balance <detailed-account>"),
            ("group", "group <name>"),
            ("Detailed", "detailed <fixed> <name>"),
            ("delete", "delete <level> <code>"),
            ("chart", "chart"),
        ])
    }

    #[test]
    fn completes_command_names_then_levels() {
        let helper = helper();

        assert_eq!(
            helper.candidates("de", 2),
            (0, vec!["delete".to_string(), "detailed".to_string()])
        );
        assert_eq!(helper.candidates("delete t", 8), (7, vec!["total".to_string()]));
        assert_eq!(helper.candidates("balance 00", 10), (8, Vec::new()));
        assert_eq!(helper.candidates("delete total 01", 15), (13, Vec::new()));
    }

    #[test]
    fn hints_show_the_argument_synopsis() {
        let helper = helper();

        assert_eq!(
            helper.usage_hint("detailed ", 9),
            Some("<fixed> <name>".to_string())
        );
        assert_eq!(helper.usage_hint("detailed", 8), None);
        assert_eq!(helper.usage_hint("detailed 01 ", 12), None);
        assert_eq!(helper.usage_hint("chart ", 6), None);
    }

    #[test]
    fn quoted_arguments_stay_together() {
        let tokens = tokenize("total 01 \"Current assets\"").expect("tokens");
        assert_eq!(tokens, vec!["total", "01", "Current assets"]);
        assert!(matches!(
            tokenize("group \"unterminated"),
            Err(CommandError::InvalidArguments(_))
        ));
    }
}
