use crate::console::editor::{create_editor, RLHelper};
use crate::console::help::help_for_command;
use crate::console::hook::TerminalHook;
use crate::debugger::breakpoint::{BreakpointView, BrkptType};
use crate::debugger::command::{
    Break, BreakpointHandlingResult, Command, Continue, Disasm, HandlingError, Memory, Register,
    StepI, StepOver,
};
use crate::debugger::process::Child;
use crate::debugger::{Debugger, DebuggerBuilder};
use crate::muted_error;
use crossterm::style::Stylize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::path::PathBuf;

mod editor;
mod help;
pub mod hook;

const WELCOME_TEXT: &str = r#"
hexstep greets, type `help` for the list of commands
"#;
const PROMT: &str = "(hs) ";

type HSEditor = Editor<RLHelper, DefaultHistory>;

#[derive(Default)]
pub struct AppBuilder {
    history: Option<PathBuf>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and save console history from the file.
    pub fn with_history(self, path: impl Into<PathBuf>) -> Self {
        Self {
            history: Some(path.into()),
        }
    }

    pub fn build(self, process: Child) -> anyhow::Result<TerminalApplication> {
        let editor = create_editor(PROMT)?;
        let debugger = DebuggerBuilder::new()
            .with_hooks(TerminalHook)
            .build(process)?;

        Ok(TerminalApplication {
            debugger,
            editor,
            history: self.history,
        })
    }
}

pub struct TerminalApplication {
    debugger: Debugger,
    editor: HSEditor,
    history: Option<PathBuf>,
}

impl TerminalApplication {
    pub fn run(mut self) -> anyhow::Result<()> {
        if let Some(ref history) = self.history {
            muted_error!(self.editor.load_history(history));
        }

        println!("{WELCOME_TEXT}");
        println!(
            "Debugee {} stopped, pid {}",
            self.debugger.process().program().green(),
            self.debugger.process().pid()
        );

        loop {
            let input = match self.editor.readline(PROMT) {
                Ok(input) => input,
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
                Err(err) => {
                    println!("error: {err:#}");
                    break;
                }
            };
            if input.trim().is_empty() {
                continue;
            }
            _ = self.editor.add_history_entry(input.as_str());

            match self.handle_command(&input) {
                Ok(Control::Continue) => {}
                Ok(Control::Quit) => break,
                Err(e) => {
                    println!("error: {e:#}");
                    if let HandlingError::Debugger(ref e) = e {
                        if e.is_fatal() {
                            break;
                        }
                    }
                }
            }

            if self.debugger.state().is_terminated() {
                break;
            }
        }

        if let Some(ref history) = self.history {
            muted_error!(self.editor.save_history(history));
        }

        Ok(())
    }

    fn handle_command(&mut self, input: &str) -> Result<Control, HandlingError> {
        match Command::parse(input)? {
            Command::Continue => {
                Continue::new(&mut self.debugger).handle()?;
            }
            Command::StepInstruction => {
                StepI::new(&mut self.debugger).handle()?;
            }
            Command::StepOver => {
                StepOver::new(&mut self.debugger).handle()?;
            }
            Command::Breakpoint(cmd) => match Break::new(&mut self.debugger).handle(&cmd)? {
                BreakpointHandlingResult::New(bp) => print_bp("Set breakpoint at address", &bp),
                BreakpointHandlingResult::Removed(bp) => {
                    print_bp("Delete breakpoint at address", &bp)
                }
                BreakpointHandlingResult::Dump(brkpts) => {
                    let mut brkpts: Vec<_> = brkpts
                        .into_iter()
                        .filter(|bp| bp.r#type == BrkptType::User)
                        .collect();
                    if brkpts.is_empty() {
                        println!("No breakpoints");
                    }
                    brkpts.sort_by_key(|bp| bp.addr);
                    brkpts
                        .iter()
                        .for_each(|bp| print_bp("- Breakpoint at address", bp));
                }
            },
            Command::Register(cmd) => {
                let response = Register::new(&self.debugger).handle(&cmd)?;
                response.iter().for_each(|register| {
                    println!("{:10} {}", register.register_name, hex_word(register.value));
                });
            }
            Command::Memory(cmd) => {
                let (addr, value) = Memory::new(&self.debugger).handle(&cmd)?;
                println!("{}: {}", addr.to_string().blue(), hex_word(value));
            }
            Command::Disasm(count) => {
                let instructions = Disasm::new(&self.debugger).handle(count)?;
                for instr in instructions {
                    println!(
                        "{} {} {}",
                        instr.address.to_string().blue(),
                        instr.mnemonic.unwrap_or_default(),
                        instr.operands.unwrap_or_default()
                    );
                }
            }
            Command::Help(topic) => {
                println!("{}", help_for_command(topic.as_deref()));
            }
            Command::Quit => return Ok(Control::Quit),
        }

        Ok(Control::Continue)
    }
}

enum Control {
    Continue,
    Quit,
}

fn print_bp(action: &str, bp: &BreakpointView) {
    let status = if bp.enabled { "" } else { " (disabled)" };
    println!("{action} {}{status}", bp.addr.to_string().blue());
}

/// Machine word as `0x` and 16 hex digits.
fn hex_word(value: u64) -> String {
    format!("{value:#018X}")
}
