use crate::debugger::address::RelocatedAddress;
use crate::debugger::code;
use crate::debugger::error::Error;
use crate::debugger::error::Error::{Ptrace, Waitpid};
use crate::debugger::register::{get_register_value, Register};
use crate::debugger::tracer::Tracer;
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

/// Semantic reason of a debugee stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Debugee stopped right after launch or attach, no event observed yet.
    Started,
    /// Debugee executes `int3` placed at the address.
    /// Instruction pointer is one byte past this address.
    BreakpointHit(RelocatedAddress),
    /// Debugee executes exactly one instruction, instruction pointer at the address.
    SingleStepCompleted(RelocatedAddress),
    /// Debugee receives `SIGSEGV` with `si_code`.
    SegmentationFault(i32),
    /// Debugee receives a signal.
    OtherSignal(Signal),
    /// Debugee receives `SIGTRAP` with unexpected `si_code`.
    UnknownTrapCode(i32),
}

impl StopReason {
    /// Signal that must be delivered to debugee at the next resume.
    pub fn signal_to_deliver(&self) -> Option<Signal> {
        match self {
            StopReason::SegmentationFault(_) => Some(Signal::SIGSEGV),
            StopReason::OtherSignal(signal) => Some(*signal),
            _ => None,
        }
    }
}

/// Debugee state observed after a wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugeeState {
    Stopped(StopReason),
    /// Debugee exited with code.
    Exited(i32),
    /// Debugee terminated by a signal.
    Killed(Signal),
}

impl DebugeeState {
    pub fn is_terminated(&self) -> bool {
        !matches!(self, DebugeeState::Stopped(_))
    }
}

/// Classify a stop by signal and its `si_code`.
///
/// # Arguments
///
/// * `signal`: signal that stopped the debugee
/// * `code`: `si_code` of the signal
/// * `pc`: current instruction pointer
pub fn classify(signal: Signal, code: i32, pc: RelocatedAddress) -> StopReason {
    match signal {
        Signal::SIGTRAP => match code {
            code::TRAP_BRKPT | code::SI_KERNEL => StopReason::BreakpointHit(pc.offset(-1)),
            code::TRAP_TRACE => StopReason::SingleStepCompleted(pc),
            code => StopReason::UnknownTrapCode(code),
        },
        Signal::SIGSEGV => StopReason::SegmentationFault(code),
        signal => StopReason::OtherSignal(signal),
    }
}

/// Wait until debugee stops or exits and classify the event.
pub fn wait_for_stop(tracer: &impl Tracer, pid: Pid) -> Result<DebugeeState, Error> {
    loop {
        let status = tracer.wait(pid).map_err(Waitpid)?;
        debug!(target: "debugger", "wait status: {status:?}");

        match status {
            WaitStatus::Exited(_, code) => return Ok(DebugeeState::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => return Ok(DebugeeState::Killed(signal)),
            WaitStatus::Stopped(_, signal) => {
                let info = match tracer.signal_info(pid) {
                    Ok(info) => info,
                    Err(Errno::ESRCH) => {
                        warn!(target: "debugger", "debugee disappears after stop");
                        continue;
                    }
                    Err(e) => return Err(Ptrace(e)),
                };

                let pc = if signal == Signal::SIGTRAP {
                    get_register_value(tracer, pid, Register::Rip)?.into()
                } else {
                    RelocatedAddress::default()
                };

                let reason = classify(signal, info.code, pc);
                if let StopReason::UnknownTrapCode(code) = reason {
                    warn!(target: "debugger", "unexpected SIGTRAP code {code}");
                }
                return Ok(DebugeeState::Stopped(reason));
            }
            _ => {
                warn!(target: "debugger", "unexpected wait status: {status:?}");
            }
        }
    }
}
