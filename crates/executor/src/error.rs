//! Executor errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::Word;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("address {addr:#x} out of range")]
    AddressOutOfRange { addr: Word },

    #[error("bit position {pos} out of range")]
    BitOutOfRange { pos: u32 },

    #[error("segment configuration rejected: {reason}")]
    SegmentMisconfig { reason: &'static str },

    #[error("PC {pc:#x} outside the code segment")]
    PcOutOfCodeSegment { pc: Word },

    #[error("stack overflow: {addr:#x} outside the stack segment")]
    StackOverflow { addr: Word },

    #[error("unknown syscall number {number}")]
    UnknownSyscall { number: u32 },

    #[error("unknown opcode {code:#04x}")]
    UnknownOpCode { code: u8 },

    #[error("unknown instruction type {raw:#03x}")]
    UnknownOpType { raw: u8 },

    #[error("console input of {len} bytes exceeds the {limit}-word buffer")]
    SyscallOverflow { len: usize, limit: Word },

    #[error("program file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("program file {} does not have a .bin extension", path.display())]
    BadExtension { path: PathBuf },

    #[error("line {line}: payload before any section marker")]
    PayloadBeforeMarker { line: usize },

    #[error("line {line}: malformed payload {text:?}")]
    BadPayload { line: usize, text: String },

    #[error("line {line}: segment start {start} greater than end {end}")]
    BadRange { line: usize, start: Word, end: Word },

    #[error("program file declares no {segment} segment")]
    MissingSegment { segment: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
