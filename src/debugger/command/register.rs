use crate::debugger::command::HandleResult;
use crate::debugger::tracer::Tracer;
use crate::debugger::Debugger;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Info,
    Read(String),
    Write(String, u64),
}

pub struct Register<'a, T: Tracer> {
    dbg: &'a Debugger<T>,
}

pub struct RegisterValue {
    pub register_name: String,
    pub value: u64,
}

pub type Response = Vec<RegisterValue>;

impl<'a, T: Tracer> Register<'a, T> {
    pub fn new(debugger: &'a Debugger<T>) -> Self {
        Self { dbg: debugger }
    }

    pub fn handle(&self, cmd: &Command) -> HandleResult<Response> {
        match cmd {
            Command::Info => Ok(self
                .dbg
                .dump_registers()?
                .into_iter()
                .map(|(register, value)| RegisterValue {
                    register_name: register.to_string(),
                    value,
                })
                .collect()),
            Command::Read(register) => Ok(vec![RegisterValue {
                register_name: register.to_string(),
                value: self.dbg.get_register_value(register)?,
            }]),
            Command::Write(register, value) => {
                self.dbg.set_register_value(register, *value)?;
                Ok(vec![RegisterValue {
                    register_name: register.to_string(),
                    value: *value,
                }])
            }
        }
    }
}
