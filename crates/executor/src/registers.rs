//! Register file: sixteen general-purpose words plus the program status
//! register.
//!
//! R0..R12 are general purpose; R13/R14/R15 double as SP, LR, and PC. The
//! PSR holds the four condition flags in a single byte.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::Word;

/// General-purpose register indices.
pub mod gpr {
    pub const R0: u8 = 0;
    pub const R1: u8 = 1;
    pub const R2: u8 = 2;
    pub const R3: u8 = 3;
    pub const R4: u8 = 4;
    pub const R5: u8 = 5;
    pub const R6: u8 = 6;
    pub const R7: u8 = 7;
    pub const R8: u8 = 8;
    pub const R9: u8 = 9;
    pub const R10: u8 = 10;
    pub const R11: u8 = 11;
    pub const R12: u8 = 12;
    /// Stack pointer.
    pub const SP: u8 = 13;
    /// Link register.
    pub const LR: u8 = 14;
    /// Program counter.
    pub const PC: u8 = 15;
}

/// Display names for the sixteen GP registers, in index order.
pub const GP_NAMES: [&str; 16] = [
    "R0", "R1", "R2", "R3", "R4", "R5", "R6", "R7", "R8", "R9", "R10", "R11", "R12", "SP", "LR",
    "PC",
];

bitflags! {
    /// Program status flags.
    ///
    /// Bit positions are architectural: N=0, Z=1, C=2, V=3. The same type
    /// doubles as the flag set produced by the ALU.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Psr: u8 {
        /// Negative: top bit of the result.
        const N = 1 << 0;
        /// Zero result.
        const Z = 1 << 1;
        /// Unsigned carry out of an addition.
        const C = 1 << 2;
        /// Signed overflow of an addition.
        const V = 1 << 3;
    }
}

#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    gp: [Word; 16],
    psr: Psr,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a general-purpose register. Caller contract: `index < 16`
    /// (decoded register fields are four bits wide).
    #[inline]
    pub fn gp(&self, index: u8) -> Word {
        debug_assert!(index < 16);
        self.gp[index as usize]
    }

    /// Mutable handle to a general-purpose register.
    #[inline]
    pub fn gp_mut(&mut self, index: u8) -> &mut Word {
        debug_assert!(index < 16);
        &mut self.gp[index as usize]
    }

    /// Read one status flag.
    #[inline]
    pub fn psr(&self, flag: Psr) -> bool {
        self.psr.contains(flag)
    }

    /// Set or clear one status flag.
    #[inline]
    pub fn set_psr(&mut self, flag: Psr, value: bool) {
        self.psr.set(flag, value);
    }

    /// The whole flag set.
    #[inline]
    pub fn psr_value(&self) -> Psr {
        self.psr
    }

    /// Replace the whole flag set.
    #[inline]
    pub fn replace_psr(&mut self, flags: Psr) {
        self.psr = flags;
    }

    /// Clear all four flags.
    #[inline]
    pub fn clear_psr(&mut self) {
        self.psr = Psr::empty();
    }
}
