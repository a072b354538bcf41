use crate::debugger::address::RelocatedAddress;
use crate::debugger::code;
use crate::debugger::EventHook;
use crossterm::style::Stylize;
use nix::sys::signal::Signal;

/// Print debugger events into terminal.
#[derive(Default)]
pub struct TerminalHook;

impl EventHook for TerminalHook {
    fn on_breakpoint(&self, pc: RelocatedAddress) -> anyhow::Result<()> {
        println!("Hit breakpoint at address {}", pc.to_string().blue());
        Ok(())
    }

    fn on_step(&self, pc: RelocatedAddress) -> anyhow::Result<()> {
        println!("Step to address {}", pc.to_string().blue());
        Ok(())
    }

    fn on_signal(&self, signal: Signal, code: Option<i32>) {
        match (signal, code) {
            (Signal::SIGSEGV, Some(code)) => println!(
                "Receive signal {}, debugee stopped: {} (code {code})",
                signal.to_string().red(),
                code::segv_reason(code)
            ),
            (Signal::SIGTRAP, Some(code)) => println!(
                "Receive {} with unknown code {code}",
                signal.to_string().yellow()
            ),
            _ => println!(
                "Receive signal {}, debugee stopped",
                signal.to_string().yellow()
            ),
        }
    }

    fn on_exit(&self, code: i32) {
        println!("Program exit with code: {code}");
    }

    fn on_kill(&self, signal: Signal) {
        println!("Program killed by signal {}", signal.to_string().red());
    }
}
