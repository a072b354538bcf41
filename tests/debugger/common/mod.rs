use hexstep::debugger::address::{GlobalAddress, RelocatedAddress};
use hexstep::debugger::EventHook;
use nix::sys::signal::Signal;
use object::Object;
use std::cell::{Cell, RefCell};
use std::fs;
use std::rc::Rc;

#[derive(Clone, Default)]
pub struct TestInfo {
    pub addr: Rc<Cell<Option<RelocatedAddress>>>,
    pub signals: Rc<RefCell<Vec<Signal>>>,
    pub exit_code: Rc<Cell<Option<i32>>>,
}

#[derive(Default)]
pub struct TestHooks {
    info: TestInfo,
}

impl TestHooks {
    pub fn new(info: TestInfo) -> Self {
        Self { info }
    }
}

impl EventHook for TestHooks {
    fn on_breakpoint(&self, pc: RelocatedAddress) -> anyhow::Result<()> {
        self.info.addr.set(Some(pc));
        Ok(())
    }

    fn on_step(&self, pc: RelocatedAddress) -> anyhow::Result<()> {
        self.info.addr.set(Some(pc));
        Ok(())
    }

    fn on_signal(&self, signal: Signal, _: Option<i32>) {
        self.info.signals.borrow_mut().push(signal);
    }

    fn on_exit(&self, code: i32) {
        self.info.exit_code.set(Some(code));
    }

    fn on_kill(&self, _: Signal) {}
}

/// Return program entry point as an address relative to the program file.
pub fn entry_point(file: &str) -> GlobalAddress {
    let data = fs::read(file).unwrap();
    let object = object::File::parse(data.as_slice()).unwrap();
    GlobalAddress::from(object.entry() as usize)
}

#[macro_export]
macro_rules! debugger_env {
    ($prog: expr, $debugger: ident, $hooks: expr, $code: block) => {{
        use hexstep::debugger::process::Child;
        use hexstep::debugger::DebuggerBuilder;

        let process = Child::launch($prog, Vec::<String>::new()).unwrap();
        #[allow(unused_mut)]
        let mut $debugger = DebuggerBuilder::new()
            .with_hooks($hooks)
            .build(process)
            .unwrap();
        $code
    }};
}

#[macro_export]
macro_rules! assert_no_proc {
    ($pid:expr) => {
        assert_eq!(
            nix::sys::signal::kill($pid, None),
            Err(nix::errno::Errno::ESRCH)
        )
    };
}
