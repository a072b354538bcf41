use crate::debugger::address::{GlobalAddress, RelocatedAddress};
use crate::debugger::breakpoint::BreakpointView;
use crate::debugger::command::HandleResult;
use crate::debugger::tracer::Tracer;
use crate::debugger::Debugger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointRequest {
    /// Address in debugee address space.
    Address(RelocatedAddress),
    /// Address relative to the program file.
    FileOffset(GlobalAddress),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Add(BreakpointRequest),
    Remove(RelocatedAddress),
    Info,
}

pub struct Break<'a, T: Tracer> {
    dbg: &'a mut Debugger<T>,
}

pub enum HandlingResult {
    New(BreakpointView),
    Removed(BreakpointView),
    Dump(Vec<BreakpointView>),
}

impl<'a, T: Tracer> Break<'a, T> {
    pub fn new(debugger: &'a mut Debugger<T>) -> Self {
        Self { dbg: debugger }
    }

    pub fn handle(&mut self, cmd: &Command) -> HandleResult<HandlingResult> {
        let result = match cmd {
            Command::Add(BreakpointRequest::Address(addr)) => {
                HandlingResult::New(self.dbg.set_breakpoint(*addr)?)
            }
            Command::Add(BreakpointRequest::FileOffset(addr)) => {
                HandlingResult::New(self.dbg.set_breakpoint_at_file_offset(*addr)?)
            }
            Command::Remove(addr) => HandlingResult::Removed(self.dbg.delete_breakpoint(*addr)?),
            Command::Info => HandlingResult::Dump(self.dbg.breakpoints_snapshot()),
        };
        Ok(result)
    }
}
