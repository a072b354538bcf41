use nix::libc::{c_int, c_void, user_regs_struct};
use nix::sys;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;

/// Signal number and `si_code` of the last stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalInfo {
    pub signo: c_int,
    pub code: c_int,
}

/// Request based control of a traced process.
///
/// Every request except [`Tracer::wait`] is valid only while the tracee is stopped.
/// Memory access is limited to machine word transfers.
pub trait Tracer {
    /// Read the whole register set.
    fn get_regs(&self, pid: Pid) -> nix::Result<user_regs_struct>;

    /// Write the whole register set.
    fn set_regs(&self, pid: Pid, regs: user_regs_struct) -> nix::Result<()>;

    /// Read a word at `addr`.
    fn peek(&self, pid: Pid, addr: usize) -> nix::Result<u64>;

    /// Write a word at `addr`.
    fn poke(&self, pid: Pid, addr: usize, word: u64) -> nix::Result<()>;

    /// Resume tracee until the next signal, optionally delivering `sig`.
    fn cont(&self, pid: Pid, sig: Option<Signal>) -> nix::Result<()>;

    /// Resume tracee for exactly one instruction, optionally delivering `sig`.
    fn step(&self, pid: Pid, sig: Option<Signal>) -> nix::Result<()>;

    /// Block until the tracee changes state.
    fn wait(&self, pid: Pid) -> nix::Result<WaitStatus>;

    /// Return information about the signal that caused the last stop.
    fn signal_info(&self, pid: Pid) -> nix::Result<SignalInfo>;

    /// Kill the tracee.
    fn kill(&self, pid: Pid) -> nix::Result<()>;

    /// Stop tracing and let the tracee run freely.
    fn detach(&self, pid: Pid) -> nix::Result<()>;
}

/// [`Tracer`] implementation over `ptrace` and `waitpid` system calls.
#[derive(Default, Clone, Copy)]
pub struct PtraceTracer;

impl Tracer for PtraceTracer {
    fn get_regs(&self, pid: Pid) -> nix::Result<user_regs_struct> {
        sys::ptrace::getregs(pid)
    }

    fn set_regs(&self, pid: Pid, regs: user_regs_struct) -> nix::Result<()> {
        sys::ptrace::setregs(pid, regs)
    }

    fn peek(&self, pid: Pid, addr: usize) -> nix::Result<u64> {
        sys::ptrace::read(pid, addr as *mut c_void).map(|word| word as u64)
    }

    fn poke(&self, pid: Pid, addr: usize, word: u64) -> nix::Result<()> {
        unsafe { sys::ptrace::write(pid, addr as *mut c_void, word as *mut c_void) }
    }

    fn cont(&self, pid: Pid, sig: Option<Signal>) -> nix::Result<()> {
        sys::ptrace::cont(pid, sig)
    }

    fn step(&self, pid: Pid, sig: Option<Signal>) -> nix::Result<()> {
        sys::ptrace::step(pid, sig)
    }

    fn wait(&self, pid: Pid) -> nix::Result<WaitStatus> {
        waitpid(pid, None)
    }

    fn signal_info(&self, pid: Pid) -> nix::Result<SignalInfo> {
        let info = sys::ptrace::getsiginfo(pid)?;
        Ok(SignalInfo {
            signo: info.si_signo,
            code: info.si_code,
        })
    }

    fn kill(&self, pid: Pid) -> nix::Result<()> {
        sys::signal::kill(pid, Signal::SIGKILL)
    }

    fn detach(&self, pid: Pid) -> nix::Result<()> {
        sys::ptrace::detach(pid, None)
    }
}
