//! absm-executor: instruction-set simulator for the ABS-M architecture.
//!
//! ABS-M is a small 32-bit machine: sixteen general-purpose registers
//! (R0..R12, SP, LR, PC), a four-flag program status register, a segmented
//! word-addressable memory (code/data/stack/extra), a 13-operation ALU, and
//! a fixed 32-bit instruction encoding with 23 opcodes. Programs ship as
//! line-oriented `.bin` text images; execution runs fetch → decode →
//! execute → memory-access until the all-ones terminator word is fetched.
//!
//! This crate provides:
//! - The [`cpu::Core`] driving the fetch/decode/execute loop
//! - The [`loader`] for `.bin` program images
//! - An optional [`trace::Tracer`] that records per-instruction
//!   architectural state without affecting the computation
//!
//! # Flag semantics
//!
//! The PSR is replaced wholesale by the ALU's flag set after every non-jump
//! instruction. Only ADD produces C and V, so both read as false after any
//! other instruction. This is an intentional property of the architecture,
//! not an oversight; see [`cpu`] for details.

pub mod alu;
pub mod bits;
pub mod cpu;
pub mod decode;
pub mod error;
pub mod loader;
pub mod memory;
pub mod registers;
pub mod syscall;
pub mod trace;

/// The machine word. Width is fixed at 32 bits in this build; all
/// arithmetic is modulo 2^32.
pub type Word = u32;

/// Width of a machine word in bits.
pub const WORD_BITS: u32 = 32;

pub use cpu::{Core, SegReg, SegmentMap, SegmentRange};
pub use decode::{DecodedInstr, OpCode, OpType, TERMINATOR};
pub use error::ExecutorError;
pub use loader::{load_program, Program};
pub use memory::{Memory, DEFAULT_MEM_SIZE};
pub use registers::{Psr, Registers};
pub use trace::{TraceLevel, Tracer};
