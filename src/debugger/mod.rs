pub mod address;
pub mod breakpoint;
pub mod code;
pub mod command;
pub mod disasm;
mod error;
pub mod memory;
#[cfg(test)]
mod mock;
pub mod process;
pub mod register;
mod step;
pub mod stop;
pub mod tracer;

pub use error::Error;

use crate::debugger::address::{GlobalAddress, RelocatedAddress};
use crate::debugger::breakpoint::{Breakpoint, BreakpointRegistry, BreakpointView};
use crate::debugger::disasm::{Disassembler, Instruction};
use crate::debugger::error::Error::{DecodeFailure, MappingNotFound, ProcessExit, ProcessKilled};
use crate::debugger::process::Child;
use crate::debugger::register::{Register, RegisterMap, REGISTER_DESCRIPTORS};
use crate::debugger::stop::{DebugeeState, StopReason};
use crate::debugger::tracer::{PtraceTracer, Tracer};
use crate::{muted_error, weak_error};
use log::debug;
use nix::sys::signal::Signal;
use object::{Object, ObjectKind};
use once_cell::unsync::OnceCell;
use proc_maps::MapRange;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Maximum length of a single x86_64 instruction.
const MAX_INSTRUCTION_LEN: usize = 15;

/// Stop events observed by the debugger.
pub trait EventHook {
    /// Called when debugee stops at a breakpoint.
    ///
    /// # Arguments
    ///
    /// * `pc`: address of the breakpoint
    fn on_breakpoint(&self, pc: RelocatedAddress) -> anyhow::Result<()>;

    /// Called when a step operation is completed.
    ///
    /// # Arguments
    ///
    /// * `pc`: current instruction pointer
    fn on_step(&self, pc: RelocatedAddress) -> anyhow::Result<()>;

    /// Called when debugee receives a signal.
    ///
    /// # Arguments
    ///
    /// * `signal`: received signal
    /// * `code`: `si_code` if it is meaningful for this signal
    fn on_signal(&self, signal: Signal, code: Option<i32>);

    /// Called right after debugee exit.
    fn on_exit(&self, code: i32);

    /// Called right after debugee is terminated by a signal.
    fn on_kill(&self, signal: Signal);
}

pub struct NopHook;

impl EventHook for NopHook {
    fn on_breakpoint(&self, _: RelocatedAddress) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_step(&self, _: RelocatedAddress) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_signal(&self, _: Signal, _: Option<i32>) {}

    fn on_exit(&self, _: i32) {}

    fn on_kill(&self, _: Signal) {}
}

#[derive(Default)]
pub struct DebuggerBuilder {
    hooks: Option<Box<dyn EventHook>>,
}

impl DebuggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set event hooks, [`NopHook`] is used by default.
    pub fn with_hooks(self, hooks: impl EventHook + 'static) -> Self {
        Self {
            hooks: Some(Box::new(hooks)),
        }
    }

    /// Create a debugger over a `ptrace` controlled process.
    ///
    /// # Arguments
    ///
    /// * `process`: launched or attached debugee process
    pub fn build(self, process: Child) -> Result<Debugger, Error> {
        self.build_with(PtraceTracer, process)
    }

    /// Create a debugger with a custom tracer.
    pub fn build_with<T: Tracer>(self, tracer: T, process: Child) -> Result<Debugger<T>, Error> {
        Ok(Debugger {
            tracer,
            process,
            load_base: OnceCell::new(),
            breakpoints: BreakpointRegistry::default(),
            disassembler: Disassembler::new()?,
            hooks: self.hooks.unwrap_or_else(|| Box::new(NopHook)),
            state: DebugeeState::Stopped(StopReason::Started),
            pending_signal: None,
        })
    }
}

/// Main structure of the debugger: owns the debugee process and its breakpoints,
/// drives debugee execution.
pub struct Debugger<T: Tracer = PtraceTracer> {
    tracer: T,
    process: Child,
    /// Address of the main image, lazily defined at first use.
    load_base: OnceCell<usize>,
    breakpoints: BreakpointRegistry,
    disassembler: Disassembler,
    hooks: Box<dyn EventHook>,
    /// State observed at the last wait.
    state: DebugeeState,
    /// Signal that will be delivered at the next resume.
    pending_signal: Option<Signal>,
}

impl<T: Tracer> Debugger<T> {
    pub fn process(&self) -> &Child {
        &self.process
    }

    /// Return debugee state observed at the last stop.
    pub fn state(&self) -> DebugeeState {
        self.state
    }

    fn pid(&self) -> nix::unistd::Pid {
        self.process.pid()
    }

    /// Return an error if debugee already exited.
    fn check_alive(&self) -> Result<(), Error> {
        match self.state {
            DebugeeState::Stopped(_) => Ok(()),
            DebugeeState::Exited(code) => Err(ProcessExit(code)),
            DebugeeState::Killed(signal) => Err(ProcessKilled(signal)),
        }
    }

    /// Save a new state, breakpoints are forgotten (without memory access) if debugee is gone.
    fn update_state(&mut self, state: DebugeeState) {
        match state {
            DebugeeState::Stopped(reason) => {
                self.pending_signal = reason.signal_to_deliver();
            }
            DebugeeState::Exited(_) | DebugeeState::Killed(_) => {
                self.pending_signal = None;
                let forgotten = self.breakpoints.drain().count();
                debug!(target: "debugger", "debugee gone, forget {forgotten} breakpoints");
            }
        }
        self.state = state;
    }

    /// Pass a state to event hooks.
    fn report(&self, state: DebugeeState) -> Result<(), Error> {
        match state {
            DebugeeState::Stopped(reason) => match reason {
                StopReason::Started => Ok(()),
                StopReason::BreakpointHit(addr) => {
                    self.hooks.on_breakpoint(addr).map_err(Error::Hook)
                }
                StopReason::SingleStepCompleted(pc) => self.hooks.on_step(pc).map_err(Error::Hook),
                StopReason::SegmentationFault(code) => {
                    self.hooks.on_signal(Signal::SIGSEGV, Some(code));
                    Ok(())
                }
                StopReason::OtherSignal(signal) => {
                    self.hooks.on_signal(signal, None);
                    Ok(())
                }
                StopReason::UnknownTrapCode(code) => {
                    self.hooks.on_signal(Signal::SIGTRAP, Some(code));
                    Ok(())
                }
            },
            DebugeeState::Exited(code) => {
                self.hooks.on_exit(code);
                Ok(())
            }
            DebugeeState::Killed(signal) => {
                self.hooks.on_kill(signal);
                Ok(())
            }
        }
    }

    /// Return address of the main image in debugee address space.
    /// For position dependent executables this is always 0.
    pub fn load_base(&self) -> Result<usize, Error> {
        self.load_base
            .get_or_try_init(|| self.define_load_base())
            .copied()
    }

    fn define_load_base(&self) -> Result<usize, Error> {
        self.check_alive()?;

        let file = fs::File::open(self.process.program())?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let object = object::File::parse(&*mmap)?;
        if object.kind() != ObjectKind::Dynamic {
            return Ok(0);
        }

        let absolute_debugee_path_buf = Path::new(self.process.program()).canonicalize()?;
        let absolute_debugee_path = absolute_debugee_path_buf.as_path();

        let proc_maps: Vec<MapRange> = proc_maps::get_process_maps(self.pid().as_raw())?
            .into_iter()
            .filter(|map| map.filename() == Some(absolute_debugee_path))
            .collect();

        let lowest_map = proc_maps
            .iter()
            .min_by(|map1, map2| map1.start().cmp(&map2.start()))
            .ok_or_else(|| MappingNotFound(self.process.program().to_string()))?;

        debug!(target: "debugger", "load base defined at {:#X}", lowest_map.start());
        Ok(lowest_map.start())
    }

    #[cfg(test)]
    fn set_load_base(&self, base: usize) {
        _ = self.load_base.set(base);
    }

    /// Set a new breakpoint and enable it.
    /// Breakpoint at the same address is replaced, its original byte stays in place.
    ///
    /// # Arguments
    ///
    /// * `addr`: breakpoint address in debugee address space
    pub fn set_breakpoint(&mut self, addr: RelocatedAddress) -> Result<BreakpointView, Error> {
        self.check_alive()?;

        if let Some(old) = self.breakpoints.remove(addr) {
            debug!(target: "debugger", "breakpoint at {addr} is overwritten");
            if old.is_enabled() {
                if let Err(e) = old.disable(&self.tracer) {
                    self.breakpoints.add(old);
                    return Err(e);
                }
            }
        }

        let brkpt = Breakpoint::new(addr, self.pid());
        brkpt.enable(&self.tracer)?;
        let view = BreakpointView::from(&brkpt);
        self.breakpoints.add(brkpt);
        Ok(view)
    }

    /// Set a new breakpoint by an address relative to the program file.
    pub fn set_breakpoint_at_file_offset(
        &mut self,
        addr: GlobalAddress,
    ) -> Result<BreakpointView, Error> {
        self.check_alive()?;
        let addr = addr.relocate(self.load_base()?);
        self.set_breakpoint(addr)
    }

    /// Disable and remove breakpoint.
    ///
    /// # Arguments
    ///
    /// * `addr`: breakpoint address in debugee address space
    pub fn delete_breakpoint(&mut self, addr: RelocatedAddress) -> Result<BreakpointView, Error> {
        self.check_alive()?;

        let brkpt = self
            .breakpoints
            .get(addr)
            .ok_or(Error::BreakpointNotFound(addr))?;
        let trap_pending = self.pending_trap()? == Some(addr);
        if brkpt.is_enabled() {
            brkpt.disable(&self.tracer)?;
        }
        if trap_pending {
            self.set_program_counter(addr)?;
        }
        let brkpt = self
            .breakpoints
            .remove(addr)
            .ok_or(Error::BreakpointNotFound(addr))?;
        Ok(BreakpointView::from(&brkpt))
    }

    /// Return all breakpoints ordered by address.
    pub fn breakpoints_snapshot(&self) -> Vec<BreakpointView> {
        self.breakpoints.snapshot()
    }

    /// Return all registers in `user_regs_struct` order.
    pub fn dump_registers(&self) -> Result<Vec<(Register, u64)>, Error> {
        self.check_alive()?;
        let map = RegisterMap::current(&self.tracer, self.pid())?;
        Ok(REGISTER_DESCRIPTORS
            .iter()
            .map(|rd| (rd.register, map.value(rd.register)))
            .collect())
    }

    /// Return register value by register name.
    pub fn get_register_value(&self, name: &str) -> Result<u64, Error> {
        self.check_alive()?;
        let register = Register::from_str(name)?;
        register::get_register_value(&self.tracer, self.pid(), register)
    }

    /// Set register value by register name.
    pub fn set_register_value(&self, name: &str, value: u64) -> Result<(), Error> {
        self.check_alive()?;
        let register = Register::from_str(name)?;
        register::set_register_value(&self.tracer, self.pid(), register, value)
    }

    pub fn get_program_counter(&self) -> Result<RelocatedAddress, Error> {
        self.check_alive()?;
        Ok(register::get_register_value(&self.tracer, self.pid(), Register::Rip)?.into())
    }

    pub fn set_program_counter(&self, pc: RelocatedAddress) -> Result<(), Error> {
        self.check_alive()?;
        register::set_register_value(&self.tracer, self.pid(), Register::Rip, pc.as_u64())
    }

    /// Read a word from debugee memory, bytes under breakpoints are replaced with original ones.
    pub fn read_memory(&self, addr: RelocatedAddress) -> Result<u64, Error> {
        self.check_alive()?;
        let bytes = memory::read_ignoring_breakpoints(
            &self.tracer,
            self.pid(),
            addr,
            std::mem::size_of::<u64>(),
            &self.breakpoints,
        )?;
        Ok(u64::from_le_bytes(
            bytes.try_into().expect("infallible: exactly 8 bytes read"),
        ))
    }

    /// Write a word into debugee memory.
    /// Breakpoints inside the written range stay enabled, written bytes become their original bytes.
    pub fn write_memory(&self, addr: RelocatedAddress, value: u64) -> Result<(), Error> {
        self.check_alive()?;
        memory::write_word(&self.tracer, self.pid(), addr, value)?;

        let bytes = value.to_le_bytes();
        self.breakpoints
            .iter()
            .filter(|brkpt| brkpt.is_enabled())
            .filter(|brkpt| {
                brkpt.addr >= addr && brkpt.addr.as_usize() < addr.as_usize() + bytes.len()
            })
            .try_for_each(|brkpt| {
                let byte = bytes[brkpt.addr.as_usize() - addr.as_usize()];
                brkpt.replace_saved_byte(&self.tracer, byte)
            })
    }

    /// Return address of the instruction that debugee executes at the next resume.
    /// If a breakpoint trap is pending this is the breakpoint address.
    fn effective_pc(&self) -> Result<RelocatedAddress, Error> {
        match self.pending_trap()? {
            Some(addr) => Ok(addr),
            None => self.get_program_counter(),
        }
    }

    /// Decode `count` instructions starting at `addr`, breakpoints are ignored.
    fn decode(&self, addr: RelocatedAddress, count: usize) -> Result<Vec<Instruction>, Error> {
        let word_size = std::mem::size_of::<u64>();
        let mut len = count * MAX_INSTRUCTION_LEN;
        let code = loop {
            match memory::read_ignoring_breakpoints(
                &self.tracer,
                self.pid(),
                addr,
                len,
                &self.breakpoints,
            ) {
                Ok(code) => break code,
                // window crosses the end of a mapping
                Err(Error::Ptrace(e)) if len > word_size => {
                    debug!(target: "debugger", "read {len} bytes at {addr}: {e}, shrink decode window");
                    len = (len - 1) / word_size * word_size;
                }
                Err(Error::Ptrace(_)) => return Err(DecodeFailure(addr)),
                Err(e) => return Err(e),
            }
        };
        let instructions = self.disassembler.disasm(&code, addr, count)?;
        if instructions.is_empty() {
            return Err(DecodeFailure(addr));
        }
        Ok(instructions)
    }

    /// Disassemble `count` instructions starting at the current instruction.
    pub fn disasm(&self, count: usize) -> Result<Vec<Instruction>, Error> {
        self.check_alive()?;
        self.decode(self.effective_pc()?, count)
    }

    /// Continue debugee execution until the next breakpoint, signal or exit.
    pub fn continue_execution(&mut self) -> Result<DebugeeState, Error> {
        let state = self.continue_execution_inner()?;
        self.report(state)?;
        Ok(state)
    }

    fn continue_execution_inner(&mut self) -> Result<DebugeeState, Error> {
        self.check_alive()?;

        if let Some(state) = self.step_over_breakpoint_if_present_inner()? {
            if !matches!(
                state,
                DebugeeState::Stopped(StopReason::SingleStepCompleted(_))
            ) {
                return Ok(state);
            }
        }

        self.resume(false)
    }
}

impl<T: Tracer> Drop for Debugger<T> {
    fn drop(&mut self) {
        if self.state.is_terminated() {
            return;
        }
        let pid = self.pid();

        if self.process.is_external() {
            if let Some(Some(addr)) = weak_error!(self.pending_trap()) {
                weak_error!(
                    register::set_register_value(&self.tracer, pid, Register::Rip, addr.as_u64()),
                    "rewind breakpoint trap:"
                );
            }
            for brkpt in self.breakpoints.drain() {
                if brkpt.is_enabled() {
                    weak_error!(brkpt.disable(&self.tracer), "remove breakpoint:");
                }
            }
            weak_error!(
                self.tracer.detach(pid).map_err(Error::Ptrace),
                "detach debugee:"
            );
        } else {
            weak_error!(self.tracer.kill(pid).map_err(Error::Ptrace), "kill debugee:");
            muted_error!(self.tracer.wait(pid).map_err(Error::Waitpid), "reap debugee:");
        }
    }
}
