use crate::debugger::command::COMMANDS;
use crossterm::style::Stylize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::{Highlighter, MatchingBracketHighlighter};
use rustyline::hint::HistoryHinter;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Context, Editor};
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::borrow::Cow::{Borrowed, Owned};

pub struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new(commands: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }

    /// Command names starting with `line`, shortest unique prefix is highlighted.
    fn candidates(&self, line: &str) -> Vec<Pair> {
        self.commands
            .iter()
            .enumerate()
            .filter(|(_, cmd)| cmd.starts_with(line))
            .map(|(idx, cmd)| Pair {
                display: display_with_prefix(cmd, shortest_prefix(&self.commands[..idx], cmd)),
                replacement: cmd.to_string(),
            })
            .collect()
    }
}

/// Length of the shortest prefix that selects `cmd` when commands before it are checked first.
fn shortest_prefix(preceding: &[&str], cmd: &str) -> usize {
    (1..=cmd.len())
        .find(|&len| !preceding.iter().any(|other| other.starts_with(&cmd[..len])))
        .unwrap_or(cmd.len())
}

fn display_with_prefix(cmd: &str, prefix_len: usize) -> String {
    format!(
        "{}{}",
        cmd[..prefix_len].to_string().bold().underlined(),
        &cmd[prefix_len..]
    )
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        if line.contains(char::is_whitespace) {
            return Ok((0, vec![]));
        }
        Ok((0, self.candidates(line)))
    }
}

#[derive(Helper, Completer, Hinter, Validator)]
pub struct RLHelper {
    #[rustyline(Completer)]
    pub completer: CommandCompleter,
    highlighter: MatchingBracketHighlighter,
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
    pub colored_prompt: String,
}

impl Highlighter for RLHelper {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        self.highlighter.highlight(line, pos)
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default {
            Borrowed(&self.colored_prompt)
        } else {
            Borrowed(prompt)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned("\x1b[1m".to_owned() + hint + "\x1b[m")
    }

    fn highlight_char(&self, line: &str, pos: usize, forced: bool) -> bool {
        self.highlighter.highlight_char(line, pos, forced)
    }
}

pub fn create_editor(promt: &str) -> anyhow::Result<Editor<RLHelper, DefaultHistory>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let h = RLHelper {
        completer: CommandCompleter::new(COMMANDS),
        highlighter: MatchingBracketHighlighter::new(),
        hinter: HistoryHinter::new(),
        colored_prompt: format!("{}", promt.green()),
    };

    let mut editor = Editor::with_config(config)?;
    editor.set_helper(Some(h));

    Ok(editor)
}
