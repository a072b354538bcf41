use crate::debugger::command::HandleResult;
use crate::debugger::disasm::Instruction;
use crate::debugger::tracer::Tracer;
use crate::debugger::Debugger;

pub struct Disasm<'a, T: Tracer> {
    dbg: &'a Debugger<T>,
}

impl<'a, T: Tracer> Disasm<'a, T> {
    pub fn new(debugger: &'a Debugger<T>) -> Self {
        Self { dbg: debugger }
    }

    pub fn handle(&self, count: usize) -> HandleResult<Vec<Instruction>> {
        Ok(self.dbg.disasm(count)?)
    }
}
