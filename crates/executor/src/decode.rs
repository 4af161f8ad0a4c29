//! Instruction decoder for the fixed 32-bit ABS-M encoding.
//!
//! Field layout, bit 0 = least significant:
//!
//! ```text
//! [0:4)   op_type
//! [4:12)  op_code
//! [12:16) Rd
//! [16:20) Rm
//! [20:24) Rn        (shares storage with imm)
//! [20:32) imm       (12 bits, used when Rn is absent)
//! ```
//!
//! Decoding is plain shift-and-mask field extraction and is total: every
//! 32-bit word decodes. Whether the `(op_type, op_code)` pair makes sense is
//! the core's problem, via the fallible [`OpType::from_u8`] and
//! [`OpCode::from_u8`] conversions.

use serde::{Deserialize, Serialize};

use crate::Word;

/// The all-ones terminator word. Fetching it halts execution normally.
pub const TERMINATOR: Word = Word::MAX;

/// Instruction shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpType {
    /// Two source registers: `ADD Rd, Rm, Rn`.
    R = 0,
    /// One source register plus immediate: `ADD Rd, Rm, imm`.
    I = 1,
    /// Unary: `NOT Rd, Rm` / `LDR Rd, Rm` / `STR Rd, Rm`.
    U = 2,
    /// Stack: `PUSH Rd` / `POP Rd`.
    S = 3,
    /// Branch or syscall: `JMP imm` / `SYSCALL imm`.
    J = 4,
}

impl OpType {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::R),
            1 => Some(Self::I),
            2 => Some(Self::U),
            3 => Some(Self::S),
            4 => Some(Self::J),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::R => "R type",
            Self::I => "I type",
            Self::U => "U type",
            Self::S => "S type",
            Self::J => "J type",
        }
    }
}

/// Instruction opcodes (23 total).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    Add = 0,
    Umul = 1,
    Udiv = 2,
    Umol = 3,
    And = 4,
    Orr = 5,
    Xor = 6,
    Shl = 7,
    Shr = 8,
    Rtl = 9,
    Rtr = 10,
    Not = 11,
    Ldr = 12,
    Str = 13,
    Push = 14,
    Pop = 15,
    Jmp = 16,
    Jz = 17,
    Jn = 18,
    Jc = 19,
    Jv = 20,
    Jzn = 21,
    Syscall = 22,
}

impl OpCode {
    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Add,
            1 => Self::Umul,
            2 => Self::Udiv,
            3 => Self::Umol,
            4 => Self::And,
            5 => Self::Orr,
            6 => Self::Xor,
            7 => Self::Shl,
            8 => Self::Shr,
            9 => Self::Rtl,
            10 => Self::Rtr,
            11 => Self::Not,
            12 => Self::Ldr,
            13 => Self::Str,
            14 => Self::Push,
            15 => Self::Pop,
            16 => Self::Jmp,
            17 => Self::Jz,
            18 => Self::Jn,
            19 => Self::Jc,
            20 => Self::Jv,
            21 => Self::Jzn,
            22 => Self::Syscall,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Umul => "UMUL",
            Self::Udiv => "UDIV",
            Self::Umol => "UMOL",
            Self::And => "AND",
            Self::Orr => "ORR",
            Self::Xor => "XOR",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
            Self::Rtl => "RTL",
            Self::Rtr => "RTR",
            Self::Not => "NOT",
            Self::Ldr => "LDR",
            Self::Str => "STR",
            Self::Push => "PUSH",
            Self::Pop => "POP",
            Self::Jmp => "JMP",
            Self::Jz => "JZ",
            Self::Jn => "JN",
            Self::Jc => "JC",
            Self::Jv => "JV",
            Self::Jzn => "JZN",
            Self::Syscall => "SYSCALL",
        }
    }
}

/// Decoded instruction: raw field values, exactly as extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedInstr {
    /// Raw instruction bits.
    pub bits: Word,
    /// Instruction shape field, see [`OpType`].
    pub op_type: u8,
    /// Opcode field, see [`OpCode`].
    pub op_code: u8,
    /// Destination register.
    pub rd: u8,
    /// First source register.
    pub rm: u8,
    /// Second source register; aliases the low nibble of `imm`.
    pub rn: u8,
    /// 12-bit immediate.
    pub imm: u16,
}

impl DecodedInstr {
    /// Decode a 32-bit instruction word. Total: never fails.
    pub fn decode(bits: Word) -> Self {
        Self {
            bits,
            op_type: (bits & 0xF) as u8,
            op_code: ((bits >> 4) & 0xFF) as u8,
            rd: ((bits >> 12) & 0xF) as u8,
            rm: ((bits >> 16) & 0xF) as u8,
            rn: ((bits >> 20) & 0xF) as u8,
            imm: ((bits >> 20) & 0xFFF) as u16,
        }
    }

    /// Reassemble the instruction word from the decoded fields.
    ///
    /// `rn` is not encoded separately: it lives in the low nibble of `imm`.
    pub fn encode(&self) -> Word {
        (self.op_type as Word & 0xF)
            | ((self.op_code as Word) << 4)
            | ((self.rd as Word & 0xF) << 12)
            | ((self.rm as Word & 0xF) << 16)
            | ((self.imm as Word & 0xFFF) << 20)
    }
}

fn assemble(op_type: OpType, op_code: OpCode, rd: u8, rm: u8, imm: u16) -> Word {
    DecodedInstr {
        bits: 0,
        op_type: op_type as u8,
        op_code: op_code as u8,
        rd,
        rm,
        rn: (imm & 0xF) as u8,
        imm,
    }
    .encode()
}

/// Assemble an R-type instruction: `code Rd, Rm, Rn`.
pub fn assemble_r(code: OpCode, rd: u8, rm: u8, rn: u8) -> Word {
    assemble(OpType::R, code, rd, rm, (rn & 0xF) as u16)
}

/// Assemble an I-type instruction: `code Rd, Rm, imm`.
pub fn assemble_i(code: OpCode, rd: u8, rm: u8, imm: u16) -> Word {
    assemble(OpType::I, code, rd, rm, imm & 0xFFF)
}

/// Assemble a U-type instruction: `code Rd, Rm`.
pub fn assemble_u(code: OpCode, rd: u8, rm: u8) -> Word {
    assemble(OpType::U, code, rd, rm, 0)
}

/// Assemble an S-type instruction: `code Rd`.
pub fn assemble_s(code: OpCode, rd: u8) -> Word {
    assemble(OpType::S, code, rd, 0, 0)
}

/// Assemble a J-type instruction: `code imm`.
pub fn assemble_j(code: OpCode, imm: u16) -> Word {
    assemble(OpType::J, code, 0, 0, imm & 0xFFF)
}
