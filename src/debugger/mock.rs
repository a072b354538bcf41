//! In-memory [`Tracer`] used by unit tests.
//!
//! Tracee is a flat memory image with a tiny x86_64 interpreter which understands:
//! `nop`, `int3`, `call rel32`, `ret`, `mov eax, imm32` and `syscall` (only `exit`).
//! Any other opcode raises `SIGILL`, leaving the image raises `SIGSEGV`.

use crate::debugger::code;
use crate::debugger::register::{Register, RegisterMap};
use crate::debugger::tracer::{SignalInfo, Tracer};
use nix::errno::Errno;
use nix::libc::user_regs_struct;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::cell::RefCell;

pub const CODE_BASE: usize = 0x400000;
pub const MEMORY_SIZE: usize = 0x2000;
pub const STACK_TOP: usize = CODE_BASE + MEMORY_SIZE - 0x100;

const NOP: u8 = 0x90;
const MAX_STEPS: usize = 1_000_000;
const SYS_EXIT: u64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    Cont(Option<Signal>),
    Step(Option<Signal>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Status {
    Stopped(SignalInfo),
    Exited,
    Killed,
    Detached,
}

enum Event {
    Trap(i32),
    Fault(Signal, i32),
    Exit(i32),
}

struct Inner {
    memory: Vec<u8>,
    regs: RegisterMap,
    status: Status,
    pending: Option<WaitStatus>,
    requests: Vec<Request>,
}

pub struct MockTracer {
    pid: Pid,
    inner: RefCell<Inner>,
}

impl MockTracer {
    /// Create a tracee stopped at [`CODE_BASE`] right after `exec`, memory filled with `nop`.
    pub fn new() -> Self {
        let mut regs = RegisterMap::default();
        regs.update(Register::Rip, CODE_BASE as u64);
        regs.update(Register::Rsp, STACK_TOP as u64);
        regs.update(Register::Rflags, 0x246);

        Self {
            pid: Pid::from_raw(4242),
            inner: RefCell::new(Inner {
                memory: vec![NOP; MEMORY_SIZE],
                regs,
                status: Status::Stopped(SignalInfo {
                    signo: Signal::SIGTRAP as i32,
                    code: 0,
                }),
                pending: None,
                requests: vec![],
            }),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Place machine code at `addr`.
    pub fn load(&self, addr: usize, code: &[u8]) {
        let mut inner = self.inner.borrow_mut();
        let offset = addr - CODE_BASE;
        inner.memory[offset..offset + code.len()].copy_from_slice(code);
    }

    pub fn bytes(&self, addr: usize, len: usize) -> Vec<u8> {
        let inner = self.inner.borrow();
        let offset = addr - CODE_BASE;
        inner.memory[offset..offset + len].to_vec()
    }

    pub fn pc(&self) -> u64 {
        self.inner.borrow().regs.value(Register::Rip)
    }

    /// Terminate tracee as if it called `exit(code)`.
    pub fn exit(&self, code: i32) {
        let mut inner = self.inner.borrow_mut();
        inner.status = Status::Exited;
        inner.pending = Some(WaitStatus::Exited(self.pid, code));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.inner.borrow().requests.clone()
    }

    pub fn is_detached(&self) -> bool {
        self.inner.borrow().status == Status::Detached
    }

    fn check_stopped(&self, pid: Pid) -> nix::Result<()> {
        if pid != self.pid {
            return Err(Errno::ESRCH);
        }
        match self.inner.borrow().status {
            Status::Stopped(_) => Ok(()),
            _ => Err(Errno::ESRCH),
        }
    }

    fn resume(&self, sig: Option<Signal>, single_step: bool) {
        let mut inner = self.inner.borrow_mut();

        if let Some(sig) = sig {
            if matches!(
                sig,
                Signal::SIGSEGV | Signal::SIGILL | Signal::SIGKILL | Signal::SIGTERM
            ) {
                inner.status = Status::Killed;
                inner.pending = Some(WaitStatus::Signaled(self.pid, sig, false));
                return;
            }
        }

        let event = if single_step {
            inner
                .exec_one()
                .unwrap_or(Event::Trap(code::TRAP_TRACE))
        } else {
            let mut steps = 0;
            loop {
                if let Some(event) = inner.exec_one() {
                    break event;
                }
                steps += 1;
                assert!(steps < MAX_STEPS, "mock debugee runs forever");
            }
        };

        match event {
            Event::Trap(code) => inner.stop(self.pid, Signal::SIGTRAP, code),
            Event::Fault(signal, code) => inner.stop(self.pid, signal, code),
            Event::Exit(code) => {
                inner.status = Status::Exited;
                inner.pending = Some(WaitStatus::Exited(self.pid, code));
            }
        }
    }
}

impl Inner {
    fn stop(&mut self, pid: Pid, signal: Signal, code: i32) {
        self.status = Status::Stopped(SignalInfo {
            signo: signal as i32,
            code,
        });
        self.pending = Some(WaitStatus::Stopped(pid, signal));
    }

    fn range(&self, addr: usize, len: usize) -> Option<std::ops::Range<usize>> {
        let start = addr.checked_sub(CODE_BASE)?;
        let end = start.checked_add(len)?;
        (end <= self.memory.len()).then_some(start..end)
    }

    fn read_u64(&self, addr: usize) -> Option<u64> {
        let range = self.range(addr, 8)?;
        Some(u64::from_le_bytes(
            self.memory[range].try_into().expect("infallible"),
        ))
    }

    fn write_u64(&mut self, addr: usize, value: u64) -> Option<()> {
        let range = self.range(addr, 8)?;
        self.memory[range].copy_from_slice(&value.to_le_bytes());
        Some(())
    }

    fn exec_one(&mut self) -> Option<Event> {
        let pc = self.regs.value(Register::Rip) as usize;
        let Some(range) = self.range(pc, 1) else {
            return Some(Event::Fault(Signal::SIGSEGV, code::SEGV_MAPERR));
        };
        let opcode = self.memory[range.start];

        let segv = Some(Event::Fault(Signal::SIGSEGV, code::SEGV_MAPERR));
        match opcode {
            NOP => {
                self.regs.update(Register::Rip, pc as u64 + 1);
                None
            }
            code::INT3 => {
                self.regs.update(Register::Rip, pc as u64 + 1);
                Some(Event::Trap(code::SI_KERNEL))
            }
            // call rel32
            0xE8 => {
                let Some(operand) = self.range(pc + 1, 4) else {
                    return segv;
                };
                let rel = i32::from_le_bytes(self.memory[operand].try_into().expect("infallible"));
                let ret_addr = pc as u64 + 5;
                let rsp = self.regs.value(Register::Rsp) - 8;
                if self.write_u64(rsp as usize, ret_addr).is_none() {
                    return segv;
                }
                self.regs.update(Register::Rsp, rsp);
                self.regs
                    .update(Register::Rip, ret_addr.wrapping_add(rel as i64 as u64));
                None
            }
            // ret
            0xC3 => {
                let rsp = self.regs.value(Register::Rsp);
                let Some(ret_addr) = self.read_u64(rsp as usize) else {
                    return segv;
                };
                self.regs.update(Register::Rsp, rsp + 8);
                self.regs.update(Register::Rip, ret_addr);
                None
            }
            // mov eax, imm32
            0xB8 => {
                let Some(operand) = self.range(pc + 1, 4) else {
                    return segv;
                };
                let imm = u32::from_le_bytes(self.memory[operand].try_into().expect("infallible"));
                self.regs.update(Register::Rax, imm as u64);
                self.regs.update(Register::Rip, pc as u64 + 5);
                None
            }
            // syscall
            0x0F if self.range(pc + 1, 1).map(|r| self.memory[r.start]) == Some(0x05) => {
                if self.regs.value(Register::Rax) == SYS_EXIT {
                    return Some(Event::Exit(self.regs.value(Register::Rdi) as i32));
                }
                self.regs.update(Register::Rax, (-38_i64) as u64);
                self.regs.update(Register::Rip, pc as u64 + 2);
                None
            }
            _ => Some(Event::Fault(Signal::SIGILL, 1)),
        }
    }
}

impl Tracer for MockTracer {
    fn get_regs(&self, pid: Pid) -> nix::Result<user_regs_struct> {
        self.check_stopped(pid)?;
        Ok(self.inner.borrow().regs.into())
    }

    fn set_regs(&self, pid: Pid, regs: user_regs_struct) -> nix::Result<()> {
        self.check_stopped(pid)?;
        self.inner.borrow_mut().regs = regs.into();
        Ok(())
    }

    fn peek(&self, pid: Pid, addr: usize) -> nix::Result<u64> {
        self.check_stopped(pid)?;
        self.inner.borrow().read_u64(addr).ok_or(Errno::EIO)
    }

    fn poke(&self, pid: Pid, addr: usize, word: u64) -> nix::Result<()> {
        self.check_stopped(pid)?;
        self.inner
            .borrow_mut()
            .write_u64(addr, word)
            .ok_or(Errno::EIO)
    }

    fn cont(&self, pid: Pid, sig: Option<Signal>) -> nix::Result<()> {
        self.check_stopped(pid)?;
        self.inner.borrow_mut().requests.push(Request::Cont(sig));
        self.resume(sig, false);
        Ok(())
    }

    fn step(&self, pid: Pid, sig: Option<Signal>) -> nix::Result<()> {
        self.check_stopped(pid)?;
        self.inner.borrow_mut().requests.push(Request::Step(sig));
        self.resume(sig, true);
        Ok(())
    }

    fn wait(&self, pid: Pid) -> nix::Result<WaitStatus> {
        if pid != self.pid {
            return Err(Errno::ECHILD);
        }
        self.inner.borrow_mut().pending.take().ok_or(Errno::ECHILD)
    }

    fn signal_info(&self, pid: Pid) -> nix::Result<SignalInfo> {
        self.check_stopped(pid)?;
        match self.inner.borrow().status {
            Status::Stopped(info) => Ok(info),
            _ => Err(Errno::ESRCH),
        }
    }

    fn kill(&self, pid: Pid) -> nix::Result<()> {
        if pid != self.pid {
            return Err(Errno::ESRCH);
        }
        let mut inner = self.inner.borrow_mut();
        inner.status = Status::Killed;
        inner.pending = Some(WaitStatus::Signaled(pid, Signal::SIGKILL, false));
        Ok(())
    }

    fn detach(&self, pid: Pid) -> nix::Result<()> {
        self.check_stopped(pid)?;
        self.inner.borrow_mut().status = Status::Detached;
        Ok(())
    }
}

impl<T: Tracer> Tracer for &T {
    fn get_regs(&self, pid: Pid) -> nix::Result<user_regs_struct> {
        (**self).get_regs(pid)
    }

    fn set_regs(&self, pid: Pid, regs: user_regs_struct) -> nix::Result<()> {
        (**self).set_regs(pid, regs)
    }

    fn peek(&self, pid: Pid, addr: usize) -> nix::Result<u64> {
        (**self).peek(pid, addr)
    }

    fn poke(&self, pid: Pid, addr: usize, word: u64) -> nix::Result<()> {
        (**self).poke(pid, addr, word)
    }

    fn cont(&self, pid: Pid, sig: Option<Signal>) -> nix::Result<()> {
        (**self).cont(pid, sig)
    }

    fn step(&self, pid: Pid, sig: Option<Signal>) -> nix::Result<()> {
        (**self).step(pid, sig)
    }

    fn wait(&self, pid: Pid) -> nix::Result<WaitStatus> {
        (**self).wait(pid)
    }

    fn signal_info(&self, pid: Pid) -> nix::Result<SignalInfo> {
        (**self).signal_info(pid)
    }

    fn kill(&self, pid: Pid) -> nix::Result<()> {
        (**self).kill(pid)
    }

    fn detach(&self, pid: Pid) -> nix::Result<()> {
        (**self).detach(pid)
    }
}
