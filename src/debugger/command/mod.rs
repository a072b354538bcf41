//! Debugger commands: text parsing and handlers over [`Debugger`](crate::debugger::Debugger).
//!
//! Any non-empty prefix of a command name selects the first command in [`COMMANDS`] order,
//! all numbers are hexadecimal with an optional `0x` prefix.

mod r#break;
mod r#continue;
mod disasm;
mod memory;
mod register;
mod step_instruction;
mod step_over;

pub use disasm::Disasm;
pub use memory::Command as MemoryCommand;
pub use memory::Memory;
pub use r#break::Break;
pub use r#break::BreakpointRequest;
pub use r#break::Command as BreakpointCommand;
pub use r#break::HandlingResult as BreakpointHandlingResult;
pub use r#continue::Continue;
pub use register::Command as RegisterCommand;
pub use register::Register;
pub use register::RegisterValue;
pub use step_instruction::StepI;
pub use step_over::StepOver;

use crate::debugger;
use crate::debugger::address::{GlobalAddress, RelocatedAddress};
use std::num::ParseIntError;

pub const CONTINUE_COMMAND: &str = "continue";
pub const BREAK_COMMAND: &str = "break";
pub const DELETE_COMMAND: &str = "delete";
pub const REGISTER_COMMAND: &str = "register";
pub const SET_COMMAND: &str = "set";
pub const MEMORY_COMMAND: &str = "memory";
pub const STEP_INSTRUCTION_COMMAND: &str = "instep";
pub const STEP_OVER_COMMAND: &str = "next";
pub const INFO_COMMAND: &str = "info";
pub const DISASM_COMMAND: &str = "disasm";
pub const HELP_COMMAND: &str = "help";
pub const QUIT_COMMAND: &str = "quit";

/// Command names in the order of prefix resolution.
pub const COMMANDS: [&str; 12] = [
    CONTINUE_COMMAND,
    BREAK_COMMAND,
    DELETE_COMMAND,
    REGISTER_COMMAND,
    SET_COMMAND,
    MEMORY_COMMAND,
    STEP_INSTRUCTION_COMMAND,
    STEP_OVER_COMMAND,
    INFO_COMMAND,
    DISASM_COMMAND,
    HELP_COMMAND,
    QUIT_COMMAND,
];

const DEFAULT_DISASM_COUNT: usize = 5;

/// External commands that can be processed by the debugger.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Continue,
    Breakpoint(r#break::Command),
    Register(register::Command),
    Memory(memory::Command),
    StepInstruction,
    StepOver,
    Disasm(usize),
    Help(Option<String>),
    Quit,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command {0:?} (try `help`)")]
    UnknownCommand(String),
    #[error("malformed command (try `help {0}`)")]
    InvalidArguments(&'static str),
    #[error("invalid hexadecimal number {0:?}: {1}")]
    InvalidNumber(String, ParseIntError),
}

#[derive(thiserror::Error, Debug)]
pub enum HandlingError {
    #[error(transparent)]
    Parser(#[from] CommandError),
    #[error(transparent)]
    Debugger(#[from] debugger::Error),
}

pub type HandleResult<T> = Result<T, HandlingError>;

/// Parse hexadecimal number, `0x` prefix is optional.
pub fn parse_hex(input: &str) -> Result<u64, CommandError> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    u64::from_str_radix(digits, 16).map_err(|e| CommandError::InvalidNumber(input.to_string(), e))
}

fn parse_addr(input: &str) -> Result<RelocatedAddress, CommandError> {
    parse_hex(input).map(RelocatedAddress::from)
}

/// Find a command name by its prefix.
pub fn resolve(prefix: &str) -> Option<&'static str> {
    if prefix.is_empty() {
        return None;
    }
    COMMANDS.iter().copied().find(|cmd| cmd.starts_with(prefix))
}

impl Command {
    /// Parse input string into command.
    pub fn parse(input: &str) -> Result<Command, CommandError> {
        let args: Vec<&str> = input.split_whitespace().collect();
        let Some((&name, args)) = args.split_first() else {
            return Err(CommandError::UnknownCommand(String::new()));
        };
        let command =
            resolve(name).ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

        let command = match (command, args) {
            (CONTINUE_COMMAND, []) => Command::Continue,
            (BREAK_COMMAND, [addr]) => {
                let request = match addr.strip_prefix('*') {
                    Some(offset) => {
                        BreakpointRequest::FileOffset(GlobalAddress::from(parse_hex(offset)?))
                    }
                    None => BreakpointRequest::Address(parse_addr(addr)?),
                };
                Command::Breakpoint(r#break::Command::Add(request))
            }
            (DELETE_COMMAND, [addr]) => {
                Command::Breakpoint(r#break::Command::Remove(parse_addr(addr)?))
            }
            (REGISTER_COMMAND, []) => Command::Register(register::Command::Info),
            (REGISTER_COMMAND, [name]) => match name.strip_prefix('$') {
                Some(name) if !name.is_empty() => {
                    Command::Register(register::Command::Read(name.to_string()))
                }
                _ => return Err(CommandError::InvalidArguments(REGISTER_COMMAND)),
            },
            (SET_COMMAND, [target, value]) => {
                let value = parse_hex(value)?;
                if let Some(name) = target.strip_prefix('$').filter(|n| !n.is_empty()) {
                    Command::Register(register::Command::Write(name.to_string(), value))
                } else if let Some(addr) = target.strip_prefix('*') {
                    Command::Memory(memory::Command::Write(parse_addr(addr)?, value))
                } else {
                    return Err(CommandError::InvalidArguments(SET_COMMAND));
                }
            }
            (MEMORY_COMMAND, [addr]) => Command::Memory(memory::Command::Read(parse_addr(addr)?)),
            (STEP_INSTRUCTION_COMMAND, []) => Command::StepInstruction,
            (STEP_OVER_COMMAND, []) => Command::StepOver,
            (INFO_COMMAND, []) => Command::Breakpoint(r#break::Command::Info),
            (DISASM_COMMAND, []) => Command::Disasm(DEFAULT_DISASM_COUNT),
            (DISASM_COMMAND, [count]) => match count.parse::<usize>() {
                Ok(count) if count > 0 => Command::Disasm(count),
                _ => return Err(CommandError::InvalidArguments(DISASM_COMMAND)),
            },
            (HELP_COMMAND, []) => Command::Help(None),
            (HELP_COMMAND, [topic]) => Command::Help(Some(
                resolve(topic)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| topic.to_string()),
            )),
            (QUIT_COMMAND, []) => Command::Quit,
            (command, _) => return Err(CommandError::InvalidArguments(command)),
        };

        Ok(command)
    }
}
