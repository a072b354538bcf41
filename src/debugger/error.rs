use crate::debugger::address::RelocatedAddress;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),

    // --------------------------------- debugger entity not found----------------------------------
    #[error("unknown register {0}")]
    RegisterNotFound(i32),
    #[error("unknown register {0:?}")]
    RegisterNameNotFound(String),
    #[error("no breakpoint at address {0}")]
    BreakpointNotFound(RelocatedAddress),

    // --------------------------------- breakpoint state errors -----------------------------------
    #[error("breakpoint at address {0} already enabled")]
    BreakpointAlreadyEnabled(RelocatedAddress),
    #[error("breakpoint at address {0} is not enabled")]
    BreakpointNotEnabled(RelocatedAddress),

    // --------------------------------- load base errors ------------------------------------------
    #[error("memory region not found for a file: {0}")]
    MappingNotFound(String),
    #[error("object file parsing error: {0}")]
    ObjParsing(#[from] object::Error),

    // --------------------------------- syscall errors --------------------------------------------
    #[error("waitpid syscall error: {0}")]
    Waitpid(nix::Error),
    #[error("ptrace syscall error: {0}")]
    Ptrace(nix::Error),

    // --------------------------------- debugee process errors ------------------------------------
    #[error("debugee process exit with code {0}")]
    ProcessExit(i32),
    #[error("debugee process killed by signal {0}")]
    ProcessKilled(Signal),
    #[error("launch debugee: {0}")]
    Launch(std::io::Error),
    #[error("debugee stopped with unexpected status on launch")]
    UnexpectedLaunchStatus,

    // --------------------------------- disasm ----------------------------------------------------
    #[error("install disassembler: {0}")]
    DisAsmInit(capstone::Error),
    #[error("instructions disassembly error: {0}")]
    DisAsm(capstone::Error),
    #[error("no instructions decoded at address {0}")]
    DecodeFailure(RelocatedAddress),

    // --------------------------------- third party errors ----------------------------------------
    #[error("hook: {0}")]
    Hook(anyhow::Error),

    // --------------------------------- attach debugee errors -------------------------------------
    #[error("process pid {0} not found")]
    AttachedProcessNotFound(Pid),
    #[error("attach a running process: {0}")]
    Attach(nix::Error),
}

impl Error {
    /// Return a hint to an interface - continue debugging after error or stop whole process.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::IO(_) => false,
            Error::RegisterNotFound(_) => false,
            Error::RegisterNameNotFound(_) => false,
            Error::BreakpointNotFound(_) => false,
            Error::BreakpointAlreadyEnabled(_) => false,
            Error::BreakpointNotEnabled(_) => false,
            Error::MappingNotFound(_) => false,
            Error::ObjParsing(_) => false,
            Error::Waitpid(_) => false,
            Error::Ptrace(_) => false,
            Error::ProcessExit(_) => false,
            Error::ProcessKilled(_) => false,
            Error::DisAsm(_) => false,
            Error::DecodeFailure(_) => false,
            Error::Hook(_) => false,

            // currently fatal errors
            Error::Launch(_) => true,
            Error::UnexpectedLaunchStatus => true,
            Error::DisAsmInit(_) => true,
            Error::AttachedProcessNotFound(_) => true,
            Error::Attach(_) => true,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}
