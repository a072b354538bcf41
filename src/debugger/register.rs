use crate::debugger::error::Error;
use crate::debugger::error::Error::Ptrace;
use crate::debugger::tracer::Tracer;
use nix::libc::user_regs_struct;
use nix::unistd::Pid;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use strum::EnumCount;
use strum_macros::{EnumCount, EnumIter};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, EnumCount, EnumIter)]
pub enum Register {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rdi,
    Rsi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
    Rip,
    Rflags,
    Cs,
    OrigRax,
    FsBase,
    GsBase,
    Fs,
    Gs,
    Ss,
    Ds,
    Es,
}

/// Static description of a machine register.
#[derive(Debug)]
pub struct RegisterDescriptor {
    pub register: Register,
    /// Word index inside `user_regs_struct`.
    pub position: usize,
    /// DWARF register number, `-1` if register has no DWARF numbering.
    pub dwarf: i32,
    pub name: &'static str,
}

macro_rules! descriptor {
    ($reg: ident, $pos: expr, $dwarf: expr, $name: expr) => {
        RegisterDescriptor {
            register: Register::$reg,
            position: $pos,
            dwarf: $dwarf,
            name: $name,
        }
    };
}

/// Register table in the `user_regs_struct` layout order.
pub const REGISTER_DESCRIPTORS: [RegisterDescriptor; Register::COUNT] = [
    descriptor!(R15, 0, 15, "r15"),
    descriptor!(R14, 1, 14, "r14"),
    descriptor!(R13, 2, 13, "r13"),
    descriptor!(R12, 3, 12, "r12"),
    descriptor!(Rbp, 4, 6, "rbp"),
    descriptor!(Rbx, 5, 3, "rbx"),
    descriptor!(R11, 6, 11, "r11"),
    descriptor!(R10, 7, 10, "r10"),
    descriptor!(R9, 8, 9, "r9"),
    descriptor!(R8, 9, 8, "r8"),
    descriptor!(Rax, 10, 0, "rax"),
    descriptor!(Rcx, 11, 2, "rcx"),
    descriptor!(Rdx, 12, 1, "rdx"),
    descriptor!(Rsi, 13, 4, "rsi"),
    descriptor!(Rdi, 14, 5, "rdi"),
    descriptor!(OrigRax, 15, -1, "orig_rax"),
    descriptor!(Rip, 16, -1, "rip"),
    descriptor!(Cs, 17, 51, "cs"),
    descriptor!(Rflags, 18, 49, "eflags"),
    descriptor!(Rsp, 19, 7, "rsp"),
    descriptor!(Ss, 20, 52, "ss"),
    descriptor!(FsBase, 21, 58, "fs_base"),
    descriptor!(GsBase, 22, 59, "gs_base"),
    descriptor!(Ds, 23, 53, "ds"),
    descriptor!(Es, 24, 50, "es"),
    descriptor!(Fs, 25, 54, "fs"),
    descriptor!(Gs, 26, 55, "gs"),
];

impl Register {
    pub fn descriptor(self) -> &'static RegisterDescriptor {
        REGISTER_DESCRIPTORS
            .iter()
            .find(|rd| rd.register == self)
            .expect("every register is described")
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Find register by DWARF register number.
    pub fn from_dwarf(number: i32) -> Result<Self, Error> {
        REGISTER_DESCRIPTORS
            .iter()
            .find(|rd| rd.dwarf != -1 && rd.dwarf == number)
            .map(|rd| rd.register)
            .ok_or(Error::RegisterNotFound(number))
    }
}

impl FromStr for Register {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        REGISTER_DESCRIPTORS
            .iter()
            .find(|rd| rd.name == name)
            .map(|rd| rd.register)
            .ok_or_else(|| Error::RegisterNameNotFound(name.to_string()))
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of the whole register set of a stopped tracee.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegisterMap([u64; Register::COUNT]);

impl From<user_regs_struct> for RegisterMap {
    fn from(value: user_regs_struct) -> Self {
        Self([
            value.r15,
            value.r14,
            value.r13,
            value.r12,
            value.rbp,
            value.rbx,
            value.r11,
            value.r10,
            value.r9,
            value.r8,
            value.rax,
            value.rcx,
            value.rdx,
            value.rsi,
            value.rdi,
            value.orig_rax,
            value.rip,
            value.cs,
            value.eflags,
            value.rsp,
            value.ss,
            value.fs_base,
            value.gs_base,
            value.ds,
            value.es,
            value.fs,
            value.gs,
        ])
    }
}

impl From<RegisterMap> for user_regs_struct {
    fn from(map: RegisterMap) -> user_regs_struct {
        let [r15, r14, r13, r12, rbp, rbx, r11, r10, r9, r8, rax, rcx, rdx, rsi, rdi, orig_rax, rip, cs, eflags, rsp, ss, fs_base, gs_base, ds, es, fs, gs] =
            map.0;
        user_regs_struct {
            r15,
            r14,
            r13,
            r12,
            rbp,
            rbx,
            r11,
            r10,
            r9,
            r8,
            rax,
            rcx,
            rdx,
            rsi,
            rdi,
            orig_rax,
            rip,
            cs,
            eflags,
            rsp,
            ss,
            fs_base,
            gs_base,
            ds,
            es,
            fs,
            gs,
        }
    }
}

impl RegisterMap {
    pub fn current(tracer: &impl Tracer, pid: Pid) -> Result<Self, Error> {
        let regs = tracer.get_regs(pid).map_err(Ptrace)?;
        Ok(regs.into())
    }

    pub fn value(&self, register: Register) -> u64 {
        self.0[register.descriptor().position]
    }

    pub fn update(&mut self, register: Register, value: u64) {
        self.0[register.descriptor().position] = value;
    }

    pub fn persist(self, tracer: &impl Tracer, pid: Pid) -> Result<(), Error> {
        tracer.set_regs(pid, self.into()).map_err(Ptrace)
    }
}

/// Read a single register value of a stopped tracee.
pub fn get_register_value(tracer: &impl Tracer, pid: Pid, register: Register) -> Result<u64, Error> {
    Ok(RegisterMap::current(tracer, pid)?.value(register))
}

/// Write a single register value of a stopped tracee.
/// Whole register set is read, updated and written back.
pub fn set_register_value(
    tracer: &impl Tracer,
    pid: Pid,
    register: Register,
    value: u64,
) -> Result<(), Error> {
    let mut map = RegisterMap::current(tracer, pid)?;
    map.update(register, value);
    map.persist(tracer, pid)
}

/// Read a register value by its DWARF number.
pub fn get_register_value_dwarf(tracer: &impl Tracer, pid: Pid, number: i32) -> Result<u64, Error> {
    get_register_value(tracer, pid, Register::from_dwarf(number)?)
}

pub fn get_register_from_name(name: &str) -> Result<Register, Error> {
    Register::from_str(name)
}
