use crate::debugger::address::RelocatedAddress;
use crate::debugger::breakpoint::Breakpoint;
use crate::debugger::disasm::InstructionKind;
use crate::debugger::error::Error;
use crate::debugger::error::Error::{DecodeFailure, Ptrace};
use crate::debugger::register::{self, Register};
use crate::debugger::stop::{wait_for_stop, DebugeeState, StopReason};
use crate::debugger::tracer::Tracer;
use crate::debugger::Debugger;
use log::debug;

impl<T: Tracer> Debugger<T> {
    /// Return breakpoint address if debugee stopped right after executing its `int3`.
    pub(super) fn pending_trap(&self) -> Result<Option<RelocatedAddress>, Error> {
        let DebugeeState::Stopped(StopReason::BreakpointHit(addr)) = self.state else {
            return Ok(None);
        };
        if self.breakpoints.get_enabled(addr).is_none() {
            return Ok(None);
        }

        let pc: RelocatedAddress =
            register::get_register_value(&self.tracer, self.pid(), Register::Rip)?.into();
        Ok((pc == addr.offset(1)).then_some(addr))
    }

    /// Resume debugee (delivering a pending signal if any) and wait for the next stop.
    pub(super) fn resume(&mut self, single_step: bool) -> Result<DebugeeState, Error> {
        let pid = self.pid();
        let signal = self.pending_signal.take();
        debug!(target: "debugger", "resume debugee, single step: {single_step}, signal: {signal:?}");

        if single_step {
            self.tracer.step(pid, signal)
        } else {
            self.tracer.cont(pid, signal)
        }
        .map_err(Ptrace)?;

        let state = wait_for_stop(&self.tracer, pid)?;
        self.update_state(state);
        Ok(state)
    }

    pub(super) fn step_over_breakpoint_if_present_inner(
        &mut self,
    ) -> Result<Option<DebugeeState>, Error> {
        self.check_alive()?;
        let Some(addr) = self.pending_trap()? else {
            return Ok(None);
        };

        register::set_register_value(&self.tracer, self.pid(), Register::Rip, addr.as_u64())?;
        if let Some(brkpt) = self.breakpoints.get_enabled(addr) {
            brkpt.disable(&self.tracer)?;
        }

        let state = self.resume(true)?;

        if !state.is_terminated() {
            if let Some(brkpt) = self.breakpoints.get(addr) {
                if !brkpt.is_enabled() {
                    brkpt.enable(&self.tracer)?;
                }
            }
        }

        Ok(Some(state))
    }

    /// Execute the instruction under a breakpoint, if debugee stopped at it.
    /// Breakpoint stays enabled after this call.
    ///
    /// Return `None` if there is no breakpoint under the program counter.
    pub fn step_over_breakpoint_if_present(&mut self) -> Result<Option<DebugeeState>, Error> {
        let state = self.step_over_breakpoint_if_present_inner()?;
        if let Some(state) = state {
            self.report(state)?;
        }
        Ok(state)
    }

    fn single_step_inner(&mut self) -> Result<DebugeeState, Error> {
        self.check_alive()?;
        match self.step_over_breakpoint_if_present_inner()? {
            Some(state) => Ok(state),
            None => self.resume(true),
        }
    }

    /// Execute exactly one instruction.
    pub fn single_step_with_breakpoint_check(&mut self) -> Result<DebugeeState, Error> {
        let state = self.single_step_inner()?;
        self.report(state)?;
        Ok(state)
    }

    /// Execute one instruction, a call instruction is executed with the whole callee.
    pub fn step_over_call(&mut self) -> Result<DebugeeState, Error> {
        let state = self.step_over_call_inner()?;
        self.report(state)?;
        Ok(state)
    }

    fn step_over_call_inner(&mut self) -> Result<DebugeeState, Error> {
        self.check_alive()?;

        let pc = self.effective_pc()?;
        let instructions = self.decode(pc, 2)?;
        let [current, next] = instructions.as_slice() else {
            return Err(DecodeFailure(pc));
        };

        if current.kind != InstructionKind::Call {
            return self.single_step_inner();
        }

        let return_addr = next.address;
        let transient = !self.breakpoints.contains(return_addr);
        if transient {
            let brkpt = Breakpoint::new_transient(return_addr, self.pid());
            brkpt.enable(&self.tracer)?;
            self.breakpoints.add(brkpt);
        }

        let result = self.continue_execution_inner();

        if transient {
            if let Some(brkpt) = self.breakpoints.remove(return_addr) {
                if brkpt.is_enabled() {
                    brkpt.disable(&self.tracer)?;
                }
            }
        }

        let state = result?;
        match state {
            DebugeeState::Stopped(StopReason::BreakpointHit(addr))
                if transient && addr == return_addr =>
            {
                register::set_register_value(
                    &self.tracer,
                    self.pid(),
                    Register::Rip,
                    return_addr.as_u64(),
                )?;
                let state = DebugeeState::Stopped(StopReason::SingleStepCompleted(return_addr));
                self.update_state(state);
                Ok(state)
            }
            state => Ok(state),
        }
    }
}
