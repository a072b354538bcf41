use crate::debugger::command::HandleResult;
use crate::debugger::stop::DebugeeState;
use crate::debugger::tracer::Tracer;
use crate::debugger::Debugger;

/// Step on next instruction
pub struct StepI<'a, T: Tracer> {
    dbg: &'a mut Debugger<T>,
}

impl<'a, T: Tracer> StepI<'a, T> {
    pub fn new(debugger: &'a mut Debugger<T>) -> Self {
        Self { dbg: debugger }
    }

    pub fn handle(&mut self) -> HandleResult<DebugeeState> {
        Ok(self.dbg.single_step_with_breakpoint_check()?)
    }
}
