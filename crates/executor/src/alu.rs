//! The ALU: a pure function from `(op, A, B)` to `(flags, result)`.
//!
//! Every operation derives N and Z from its result. C and V are produced by
//! ADD only; all other operations leave them out of the returned set, and
//! because the core replaces the PSR wholesale after each instruction, C and
//! V read as false after any non-ADD instruction.
//!
//! Division or modulus by zero is defined as a no-op: the ALU returns the
//! default output (result 0, empty flag set — note that Z is *not* set).

use serde::{Deserialize, Serialize};

use crate::bits::promote;
use crate::registers::Psr;
use crate::{Word, WORD_BITS};

/// ALU micro-operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AluOp {
    /// `A + B`, with carry and overflow detection.
    Add,
    /// `A * B` modulo the word width.
    Umul,
    /// `A / B`; division by zero yields the default output.
    Udiv,
    /// `A % B`; modulus by zero yields the default output.
    Umol,
    /// Pass `A` through unchanged.
    Pass,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Orr,
    /// Bitwise xor.
    Xor,
    /// One's complement of `A`.
    Comp,
    /// Logical shift left.
    Shl,
    /// Logical shift right.
    Shr,
    /// Rotate left.
    Rtl,
    /// Rotate right.
    Rtr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluInput {
    pub op: AluOp,
    pub a: Word,
    pub b: Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AluOutput {
    pub flags: Psr,
    pub result: Word,
}

/// Run one micro-operation. Pure: no state is read or written.
pub fn execute(input: AluInput) -> AluOutput {
    let AluInput { op, a, b } = input;
    match op {
        AluOp::Add => add(a, b),
        AluOp::Umul => from_result((promote(a) * promote(b)) as Word),
        AluOp::Udiv => {
            if b == 0 {
                AluOutput::default()
            } else {
                from_result(a / b)
            }
        }
        AluOp::Umol => {
            if b == 0 {
                AluOutput::default()
            } else {
                from_result(a % b)
            }
        }
        AluOp::Pass => from_result(a),
        AluOp::And => from_result(a & b),
        AluOp::Orr => from_result(a | b),
        AluOp::Xor => from_result(a ^ b),
        AluOp::Comp => from_result(!a),
        // Shift amounts at or past the word width shift everything out.
        AluOp::Shl => from_result(a.checked_shl(b).unwrap_or(0)),
        AluOp::Shr => from_result(a.checked_shr(b).unwrap_or(0)),
        // Rotates take the amount modulo the word width.
        AluOp::Rtl => from_result(a.rotate_left(b % WORD_BITS)),
        AluOp::Rtr => from_result(a.rotate_right(b % WORD_BITS)),
    }
}

/// N and Z, derived from the result alone.
fn result_flags(result: Word) -> Psr {
    let mut flags = Psr::empty();
    if result >> (WORD_BITS - 1) != 0 {
        flags |= Psr::N;
    }
    if result == 0 {
        flags |= Psr::Z;
    }
    flags
}

fn from_result(result: Word) -> AluOutput {
    AluOutput {
        flags: result_flags(result),
        result,
    }
}

fn add(a: Word, b: Word) -> AluOutput {
    let result = a.wrapping_add(b);
    let mut flags = result_flags(result);
    // Carry: the sum wrapped strictly past both operands.
    if result < a && result < b {
        flags |= Psr::C;
    }
    // Overflow: operands agree in sign bit but the result does not.
    let msb = |w: Word| w >> (WORD_BITS - 1) != 0;
    if msb(a) == msb(b) && msb(a) != msb(result) {
        flags |= Psr::V;
    }
    AluOutput { flags, result }
}
