pub mod console;
pub mod debugger;
