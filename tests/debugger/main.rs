#![cfg(feature = "int_test")]

mod common;

mod breakpoints;
mod steps;

use crate::common::{TestHooks, TestInfo};
use hexstep::debugger::register::Register;
use hexstep::debugger::stop::DebugeeState;
use serial_test::serial;
use std::mem;

const TRUE_APP: &str = "/bin/true";

#[test]
#[serial]
fn test_debugee_run_to_exit() {
    let info = TestInfo::default();
    debugger_env!(TRUE_APP, debugger, TestHooks::new(info.clone()), {
        let pid = debugger.process().pid();
        assert_eq!(debugger.continue_execution().unwrap(), DebugeeState::Exited(0));
        assert_eq!(info.exit_code.get(), Some(0));
        assert!(debugger.get_program_counter().is_err());
        mem::drop(debugger);

        assert_no_proc!(pid);
    });
}

#[test]
#[serial]
fn test_debugger_graceful_shutdown() {
    debugger_env!(TRUE_APP, debugger, TestHooks::default(), {
        let pid = debugger.process().pid();
        mem::drop(debugger);

        assert_no_proc!(pid);
    });
}

#[test]
#[serial]
fn test_read_write_register() {
    debugger_env!(TRUE_APP, debugger, TestHooks::default(), {
        let before = debugger.dump_registers().unwrap();

        debugger.set_register_value("rax", 0xDEADBEEF).unwrap();
        assert_eq!(debugger.get_register_value("rax").unwrap(), 0xDEADBEEF);

        let after = debugger.dump_registers().unwrap();
        for ((reg, old), (_, new)) in before.iter().zip(after.iter()) {
            if *reg != Register::Rax {
                assert_eq!(old, new, "register {} changed", reg.name());
            }
        }

        assert!(debugger.get_register_value("bogus").is_err());
    });
}

#[test]
#[serial]
fn test_read_write_memory() {
    debugger_env!(TRUE_APP, debugger, TestHooks::default(), {
        let rsp = debugger.get_register_value("rsp").unwrap();
        let addr = (rsp - 8).into();

        debugger.write_memory(addr, 0x1122334455667788).unwrap();
        assert_eq!(debugger.read_memory(addr).unwrap(), 0x1122334455667788);
    });
}
