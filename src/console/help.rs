use crate::debugger::command;

pub const HELP: &str = r#"
Available debugger commands:

c, continue                     -- continue program being debugged, after signal or breakpoint
b, break <addr>|*<offset>       -- set breakpoint at address or at file-relative offset
d, delete <addr>                -- remove breakpoint
r, register [$<name>]           -- print all registers or a single one
s, set $<name>|*<addr> <value>  -- write register or memory
m, memory <addr>                -- read 8 bytes of debugged program memory
i, instep                       -- step one instruction
n, next                         -- step one instruction, stepping over calls
info                            -- list breakpoints
disasm [count]                  -- disassemble instructions at program counter
h, help [<command>]             -- show help
q, quit                         -- exit the debugger
"#;

pub const HELP_CONTINUE: &str = "\
\x1b[32;1mc, continue\x1b[0m
Continue program being debugged, after signal or breakpoint.
If the program stopped at a breakpoint, it steps over it first.
";

pub const HELP_BREAK: &str = "\
\x1b[32;1mb, break\x1b[0m
Set a breakpoint. All numbers are hexadecimal, `0x` prefix is optional.

Examples of usage:
break 0x555555555140 - set breakpoint at address in debugee address space
break *0x1140 - set breakpoint at address relative to the program file (load base is added)
";

pub const HELP_DELETE: &str = "\
\x1b[32;1md, delete\x1b[0m
Remove a breakpoint at address, original instruction is restored.

Examples of usage:
delete 0x555555555140
";

pub const HELP_REGISTER: &str = "\
\x1b[32;1mr, register\x1b[0m
Print debugged program registers.

Examples of usage:
register - print all registers with their values
register $rip - print value of a single register
";

pub const HELP_SET: &str = "\
\x1b[32;1ms, set\x1b[0m
Write register or memory of debugged program. Values are hexadecimal.

Examples of usage:
set $rax 0xff - write register
set *0x7ffe0000 0x1 - write 8 bytes at address
";

pub const HELP_MEMORY: &str = "\
\x1b[32;1mm, memory\x1b[0m
Read 8 bytes of debugged program memory at address. Breakpoint instructions are hidden.

Examples of usage:
memory 0x7ffe0000
";

pub const HELP_STEPI: &str = "\
\x1b[32;1mi, instep\x1b[0m
Step one instruction. A breakpoint at the current instruction is stepped over.
";

pub const HELP_NEXT: &str = "\
\x1b[32;1mn, next\x1b[0m
Step one instruction. A call instruction is executed until the callee returns.
Execution stops earlier if a breakpoint or a signal is hit inside the callee.
";

pub const HELP_INFO: &str = "\
\x1b[32;1minfo\x1b[0m
List breakpoints.
";

pub const HELP_DISASM: &str = "\
\x1b[32;1mdisasm\x1b[0m
Disassemble instructions starting at the program counter (5 by default).

Examples of usage:
disasm
disasm 10
";

pub const HELP_QUIT: &str = "\
\x1b[32;1mq, quit\x1b[0m
Exit the debugger. A launched program is killed, an attached one is detached.
";

pub fn help_for_command(command: Option<&str>) -> &str {
    match command {
        None => HELP,
        Some(command::CONTINUE_COMMAND) => HELP_CONTINUE,
        Some(command::BREAK_COMMAND) => HELP_BREAK,
        Some(command::DELETE_COMMAND) => HELP_DELETE,
        Some(command::REGISTER_COMMAND) => HELP_REGISTER,
        Some(command::SET_COMMAND) => HELP_SET,
        Some(command::MEMORY_COMMAND) => HELP_MEMORY,
        Some(command::STEP_INSTRUCTION_COMMAND) => HELP_STEPI,
        Some(command::STEP_OVER_COMMAND) => HELP_NEXT,
        Some(command::INFO_COMMAND) => HELP_INFO,
        Some(command::DISASM_COMMAND) => HELP_DISASM,
        Some(command::HELP_COMMAND) => HELP,
        Some(command::QUIT_COMMAND) => HELP_QUIT,
        _ => "unknown command",
    }
}
