use crate::debugger::address::RelocatedAddress;
use crate::debugger::code::INT3;
use crate::debugger::error::Error;
use crate::debugger::error::Error::Ptrace;
use crate::debugger::tracer::Tracer;
use nix::unistd::Pid;
use std::cell::Cell;
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BrkptType {
    /// Breakpoint requested by a user.
    User,
    /// Breakpoint installed by the debugger for the duration of a single command.
    Transient,
}

/// Breakpoint representation.
#[derive(Debug)]
pub struct Breakpoint {
    pub addr: RelocatedAddress,
    pid: Pid,
    /// Byte replaced by `int3`, valid while breakpoint is enabled.
    saved_data: Cell<u8>,
    enabled: Cell<bool>,
    r#type: BrkptType,
}

impl Breakpoint {
    fn new_inner(addr: RelocatedAddress, pid: Pid, r#type: BrkptType) -> Self {
        Self {
            addr,
            pid,
            enabled: Default::default(),
            saved_data: Default::default(),
            r#type,
        }
    }

    /// Create a new disabled breakpoint.
    pub fn new(addr: RelocatedAddress, pid: Pid) -> Self {
        Self::new_inner(addr, pid, BrkptType::User)
    }

    pub fn new_transient(addr: RelocatedAddress, pid: Pid) -> Self {
        Self::new_inner(addr, pid, BrkptType::Transient)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub(crate) fn saved_byte(&self) -> u8 {
        self.saved_data.get()
    }

    /// Patch the lowest byte at breakpoint address with `int3`.
    pub fn enable(&self, tracer: &impl Tracer) -> Result<(), Error> {
        if self.is_enabled() {
            return Err(Error::BreakpointAlreadyEnabled(self.addr));
        }

        let data = tracer.peek(self.pid, self.addr.as_usize()).map_err(Ptrace)?;
        self.saved_data.set((data & 0xff) as u8);
        let data_with_pb = (data & !0xff) | INT3 as u64;
        tracer
            .poke(self.pid, self.addr.as_usize(), data_with_pb)
            .map_err(Ptrace)?;
        self.enabled.set(true);

        Ok(())
    }

    /// Replace the original byte of an enabled breakpoint, `int3` stays in place.
    /// Used after the breakpoint address was overwritten.
    pub(crate) fn replace_saved_byte(&self, tracer: &impl Tracer, byte: u8) -> Result<(), Error> {
        if !self.is_enabled() {
            return Err(Error::BreakpointNotEnabled(self.addr));
        }

        let data = tracer.peek(self.pid, self.addr.as_usize()).map_err(Ptrace)?;
        tracer
            .poke(self.pid, self.addr.as_usize(), (data & !0xff) | INT3 as u64)
            .map_err(Ptrace)?;
        self.saved_data.set(byte);

        Ok(())
    }

    /// Restore original byte at breakpoint address.
    pub fn disable(&self, tracer: &impl Tracer) -> Result<(), Error> {
        if !self.is_enabled() {
            return Err(Error::BreakpointNotEnabled(self.addr));
        }

        let data = tracer.peek(self.pid, self.addr.as_usize()).map_err(Ptrace)?;
        let restored = (data & !0xff) | self.saved_data.get() as u64;
        tracer
            .poke(self.pid, self.addr.as_usize(), restored)
            .map_err(Ptrace)?;
        self.enabled.set(false);

        Ok(())
    }
}

/// Breakpoint information for front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointView {
    pub addr: RelocatedAddress,
    pub enabled: bool,
    pub r#type: BrkptType,
}

impl From<&Breakpoint> for BreakpointView {
    fn from(brkpt: &Breakpoint) -> Self {
        Self {
            addr: brkpt.addr,
            enabled: brkpt.is_enabled(),
            r#type: brkpt.r#type,
        }
    }
}

/// Container for application breakpoints, at most one breakpoint per address.
#[derive(Default, Debug)]
pub struct BreakpointRegistry {
    breakpoints: HashMap<RelocatedAddress, Breakpoint>,
}

impl BreakpointRegistry {
    /// Add a new breakpoint to the registry, previous breakpoint at the same address
    /// is replaced and returned.
    pub fn add(&mut self, brkpt: Breakpoint) -> Option<Breakpoint> {
        self.breakpoints.insert(brkpt.addr, brkpt)
    }

    pub fn remove(&mut self, addr: RelocatedAddress) -> Option<Breakpoint> {
        self.breakpoints.remove(&addr)
    }

    pub fn get(&self, addr: RelocatedAddress) -> Option<&Breakpoint> {
        self.breakpoints.get(&addr)
    }

    pub fn get_enabled(&self, addr: RelocatedAddress) -> Option<&Breakpoint> {
        self.get(addr).filter(|brkpt| brkpt.is_enabled())
    }

    pub fn contains(&self, addr: RelocatedAddress) -> bool {
        self.breakpoints.contains_key(&addr)
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    /// Remove all breakpoints from the registry without touching tracee memory.
    pub fn drain(&mut self) -> impl Iterator<Item = Breakpoint> + '_ {
        self.breakpoints.drain().map(|(_, brkpt)| brkpt)
    }

    /// Breakpoints ordered by address.
    pub fn snapshot(&self) -> Vec<BreakpointView> {
        let mut view: Vec<BreakpointView> = self.iter().map(BreakpointView::from).collect();
        view.sort_by_key(|brkpt| brkpt.addr);
        view
    }
}
