use crate::debugger::address::RelocatedAddress;
use crate::debugger::error::Error;
use capstone::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionKind {
    /// Near or far call.
    Call,
    Other,
}

/// Single assembly instruction.
#[derive(Clone, Debug)]
pub struct Instruction {
    /// Address in debugee memory.
    pub address: RelocatedAddress,
    /// Instruction length in bytes.
    pub len: usize,
    /// Instruction mnemonic.
    pub mnemonic: Option<String>,
    /// Operands string representation.
    pub operands: Option<String>,
    pub kind: InstructionKind,
}

impl Instruction {
    /// Address of the instruction that follows this one.
    pub fn next_address(&self) -> RelocatedAddress {
        self.address.offset(self.len as isize)
    }
}

/// x86_64 machine code decoder.
pub struct Disassembler {
    cs: Capstone,
}

impl Disassembler {
    /// Create a new [`Disassembler`].
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            cs: Capstone::new()
                .x86()
                .mode(arch::x86::ArchMode::Mode64)
                .syntax(arch::x86::ArchSyntax::Att)
                .build()
                .map_err(Error::DisAsmInit)?,
        })
    }

    /// Decode at most `count` instructions from `code`.
    /// Decoding stops at the first invalid instruction.
    ///
    /// # Arguments
    ///
    /// * `code`: machine code
    /// * `addr`: address of the first byte of `code`
    /// * `count`: instruction limit
    pub fn disasm(
        &self,
        code: &[u8],
        addr: RelocatedAddress,
        count: usize,
    ) -> Result<Vec<Instruction>, Error> {
        let instructions = self
            .cs
            .disasm_count(code, addr.as_u64(), count)
            .map_err(Error::DisAsm)?
            .iter()
            .map(|i| {
                let mnemonic = i.mnemonic().map(ToString::to_string);
                let kind = match mnemonic.as_deref() {
                    Some(m) if m.starts_with("call") || m.starts_with("lcall") => {
                        InstructionKind::Call
                    }
                    _ => InstructionKind::Other,
                };
                Instruction {
                    address: i.address().into(),
                    len: i.bytes().len(),
                    mnemonic,
                    operands: i.op_str().map(ToString::to_string),
                    kind,
                }
            })
            .collect();
        Ok(instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_call() {
        let disasm = Disassembler::new().unwrap();
        let addr = RelocatedAddress::from(0x401000_usize);

        let instructions = disasm
            .disasm(&[0xE8, 0x00, 0x00, 0x00, 0x00, 0x90], addr, 2)
            .unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].kind, InstructionKind::Call);
        assert_eq!(instructions[0].len, 5);
        assert_eq!(instructions[0].next_address(), addr.offset(5));
        assert_eq!(instructions[1].address, addr.offset(5));
        assert_eq!(instructions[1].kind, InstructionKind::Other);
        assert_eq!(instructions[1].mnemonic.as_deref(), Some("nop"));
    }

    #[test]
    fn test_decode_count_limit() {
        let disasm = Disassembler::new().unwrap();
        let addr = RelocatedAddress::from(0x401000_usize);

        let instructions = disasm.disasm(&[0x90; 16], addr, 3).unwrap();
        assert_eq!(instructions.len(), 3);
        assert!(instructions
            .iter()
            .all(|i| i.kind == InstructionKind::Other && i.len == 1));
    }

    #[test]
    fn test_decode_indirect_call() {
        let disasm = Disassembler::new().unwrap();
        // call *%rax
        let instructions = disasm
            .disasm(&[0xFF, 0xD0], RelocatedAddress::from(0x401000_usize), 1)
            .unwrap();
        assert_eq!(instructions[0].kind, InstructionKind::Call);
        assert_eq!(instructions[0].len, 2);
    }
}
