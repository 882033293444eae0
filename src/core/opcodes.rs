//! Linear EVM disassembler
//!
//! Best effort: unknown bytes become `UNKNOWN_0x..` entries and a PUSH
//! running past the end of the code keeps whatever immediate bytes exist.

use revm::interpreter::opcode::{self, OpCode};
use std::borrow::Cow;

pub use revm::interpreter::opcode::{CALLCODE, CREATE, CREATE2, DELEGATECALL};

/// One decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub offset: usize,
    pub opcode: u8,
    /// PUSH immediate, possibly truncated
    pub immediate: &'a [u8],
}

impl Instruction<'_> {
    pub fn mnemonic(&self) -> Cow<'static, str> {
        mnemonic(self.opcode)
    }
}

/// Decode `code` front to back
pub fn disassemble(code: &[u8]) -> Vec<Instruction<'_>> {
    let mut out = Vec::with_capacity(code.len());
    let mut pc = 0;

    while pc < code.len() {
        let opcode = code[pc];
        let width = push_width(opcode);
        let start = (pc + 1).min(code.len());
        let end = (pc + 1 + width).min(code.len());
        out.push(Instruction {
            offset: pc,
            opcode,
            immediate: &code[start..end],
        });
        pc += 1 + width;
    }

    out
}

/// Immediate bytes following `opcode`
fn push_width(byte: u8) -> usize {
    if (opcode::PUSH1..=opcode::PUSH32).contains(&byte) {
        (byte - opcode::PUSH1 + 1) as usize
    } else {
        0
    }
}

/// revm's name for `opcode`, `UNKNOWN_0x..` for undefined bytes
pub fn mnemonic(byte: u8) -> Cow<'static, str> {
    match OpCode::new(byte) {
        Some(op) => Cow::Borrowed(op.as_str()),
        None => Cow::Owned(format!("UNKNOWN_0x{:02x}", byte)),
    }
}
