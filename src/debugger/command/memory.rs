use crate::debugger::address::RelocatedAddress;
use crate::debugger::command::HandleResult;
use crate::debugger::tracer::Tracer;
use crate::debugger::Debugger;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Read(RelocatedAddress),
    Write(RelocatedAddress, u64),
}

pub struct Memory<'a, T: Tracer> {
    dbg: &'a Debugger<T>,
}

impl<'a, T: Tracer> Memory<'a, T> {
    pub fn new(debugger: &'a Debugger<T>) -> Self {
        Self { dbg: debugger }
    }

    /// Return address and a word at this address (read or written).
    pub fn handle(&self, cmd: &Command) -> HandleResult<(RelocatedAddress, u64)> {
        match *cmd {
            Command::Read(addr) => Ok((addr, self.dbg.read_memory(addr)?)),
            Command::Write(addr, value) => {
                self.dbg.write_memory(addr, value)?;
                Ok((addr, value))
            }
        }
    }
}
