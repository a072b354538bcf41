use crate::common::{entry_point, TestHooks, TestInfo};
use crate::{debugger_env, TRUE_APP};
use hexstep::debugger::breakpoint::BrkptType;
use hexstep::debugger::stop::{DebugeeState, StopReason};
use serial_test::serial;

#[test]
#[serial]
fn test_step_from_breakpoint() {
    debugger_env!(TRUE_APP, debugger, TestHooks::default(), {
        let entry = debugger
            .set_breakpoint_at_file_offset(entry_point(TRUE_APP))
            .unwrap()
            .addr;
        debugger.continue_execution().unwrap();

        let state = debugger.single_step_with_breakpoint_check().unwrap();
        let DebugeeState::Stopped(StopReason::SingleStepCompleted(pc)) = state else {
            panic!("unexpected state {state:?}");
        };
        assert!(pc > entry);
        assert_eq!(debugger.get_program_counter().unwrap(), pc);

        let snapshot = debugger.breakpoints_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].enabled);
    });
}

#[test]
#[serial]
fn test_step_over_calls_until_exit() {
    let info = TestInfo::default();
    debugger_env!(TRUE_APP, debugger, TestHooks::new(info.clone()), {
        debugger
            .set_breakpoint_at_file_offset(entry_point(TRUE_APP))
            .unwrap();
        debugger.continue_execution().unwrap();

        // program entry calls into libc, which never returns
        for _ in 0..100 {
            match debugger.step_over_call().unwrap() {
                DebugeeState::Stopped(StopReason::SingleStepCompleted(pc)) => {
                    assert_eq!(info.addr.get(), Some(pc));
                    assert!(debugger
                        .breakpoints_snapshot()
                        .iter()
                        .all(|bp| bp.r#type == BrkptType::User));
                }
                DebugeeState::Exited(code) => {
                    assert_eq!(code, 0);
                    return;
                }
                state => panic!("unexpected state {state:?}"),
            }
        }
        panic!("program must exit");
    });
}
