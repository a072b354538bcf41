use crate::debugger::error::Error;
use crate::debugger::error::Error::{Launch, UnexpectedLaunchStatus, Waitpid};
use log::{debug, warn};
use nix::sys;
use nix::sys::personality::Persona;
use nix::sys::signal::{SIGSTOP, SIGTRAP};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use std::fs;
use std::os::unix::process::CommandExt;
use std::process::Command;

/// Debugee process traced with ptrace.
#[derive(Debug)]
pub struct Child {
    program: String,
    pid: Pid,
    /// True when process was attached by its pid.
    external: bool,
}

impl Child {
    /// Start a new traced process. Process stopped at the first instruction after `exec`.
    ///
    /// # Arguments
    ///
    /// * `program`: path to executable
    /// * `args`: program arguments
    pub fn launch<ARGS: IntoIterator<Item = I>, I: Into<String>>(
        program: impl Into<String>,
        args: ARGS,
    ) -> Result<Self, Error> {
        let program = program.into();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        let mut debugee_cmd = Command::new(&program);
        debugee_cmd.args(&args);
        unsafe {
            debugee_cmd.pre_exec(|| {
                // may be forbidden inside containers, run with randomization in this case
                _ = sys::personality::set(Persona::ADDR_NO_RANDOMIZE);
                sys::ptrace::traceme()?;
                Ok(())
            });
        }

        let child = debugee_cmd.spawn().map_err(Launch)?;
        let pid = Pid::from_raw(child.id() as i32);

        match waitpid(pid, None).map_err(Waitpid)? {
            WaitStatus::Stopped(_, SIGTRAP) => {}
            status => {
                warn!(target: "debugger", "unexpected debugee status on launch: {status:?}");
                return Err(UnexpectedLaunchStatus);
            }
        }
        debug!(target: "debugger", "debugee {program} launched with pid {pid}");

        Ok(Self {
            program,
            pid,
            external: false,
        })
    }

    /// Attach to an already running process, process stopped after this call.
    ///
    /// # Arguments
    ///
    /// * `pid`: an external process pid
    pub fn attach(pid: Pid) -> Result<Self, Error> {
        let program = fs::read_link(format!("/proc/{pid}/exe"))
            .map_err(|_| Error::AttachedProcessNotFound(pid))?
            .to_string_lossy()
            .to_string();

        sys::ptrace::attach(pid).map_err(Error::Attach)?;
        loop {
            match waitpid(pid, None).map_err(Error::Attach)? {
                WaitStatus::Stopped(_, SIGSTOP) => break,
                WaitStatus::Stopped(_, signal) => {
                    // not a stop caused by attach, deliver it and wait again
                    sys::ptrace::cont(pid, signal).map_err(Error::Attach)?;
                }
                WaitStatus::Exited(..) | WaitStatus::Signaled(..) => {
                    return Err(Error::AttachedProcessNotFound(pid))
                }
                _ => {}
            }
        }
        debug!(target: "debugger", "attached to {program} with pid {pid}");

        Ok(Self {
            program,
            pid,
            external: true,
        })
    }

    #[cfg(test)]
    pub(crate) fn stub(program: &str, pid: Pid, external: bool) -> Self {
        Self {
            program: program.to_string(),
            pid,
            external,
        }
    }

    /// Return running process pid.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Return a program name.
    pub fn program(&self) -> &str {
        self.program.as_str()
    }

    /// True when process was attached by its pid, false elsewhere.
    pub fn is_external(&self) -> bool {
        self.external
    }
}
