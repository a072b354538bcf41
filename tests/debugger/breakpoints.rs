use crate::common::{entry_point, TestHooks, TestInfo};
use crate::{debugger_env, TRUE_APP};
use hexstep::debugger::code::INT3;
use hexstep::debugger::stop::{DebugeeState, StopReason};
use hexstep::debugger::Error;
use serial_test::serial;

#[test]
#[serial]
fn test_brkpt_at_entry_point() {
    let info = TestInfo::default();
    debugger_env!(TRUE_APP, debugger, TestHooks::new(info.clone()), {
        let view = debugger
            .set_breakpoint_at_file_offset(entry_point(TRUE_APP))
            .unwrap();
        let entry = view.addr;
        assert!(view.enabled);

        let state = debugger.continue_execution().unwrap();
        assert_eq!(state, DebugeeState::Stopped(StopReason::BreakpointHit(entry)));
        assert_eq!(info.addr.get(), Some(entry));
        assert_eq!(debugger.get_program_counter().unwrap(), entry.offset(1));

        // breakpoint byte is hidden from memory reads
        assert_ne!(debugger.read_memory(entry).unwrap() as u8, INT3);

        assert_eq!(debugger.continue_execution().unwrap(), DebugeeState::Exited(0));
    });
}

#[test]
#[serial]
fn test_brkpt_delete() {
    debugger_env!(TRUE_APP, debugger, TestHooks::default(), {
        let entry = debugger
            .set_breakpoint_at_file_offset(entry_point(TRUE_APP))
            .unwrap()
            .addr;
        let original = debugger.read_memory(entry).unwrap();

        let removed = debugger.delete_breakpoint(entry).unwrap();
        assert_eq!(removed.addr, entry);
        assert!(debugger.breakpoints_snapshot().is_empty());
        assert_eq!(debugger.read_memory(entry).unwrap(), original);

        assert!(matches!(
            debugger.delete_breakpoint(entry),
            Err(Error::BreakpointNotFound(addr)) if addr == entry
        ));

        assert_eq!(debugger.continue_execution().unwrap(), DebugeeState::Exited(0));
    });
}
