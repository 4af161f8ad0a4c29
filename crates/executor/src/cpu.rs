//! The ABS-M core: segmented memory, register file, and the
//! fetch/decode/execute loop.
//!
//! The core exclusively owns memory, registers, and the segment map. A
//! tracer, when present, is a non-owning mutable borrow for the lifetime of
//! the core; every fatal condition is logged through it as an ERROR entry
//! before the error propagates to the caller.
//!
//! # Flag semantics
//!
//! After the ALU runs, the PSR is **replaced wholesale** by the flag set the
//! ALU returned. Since only ADD produces C and V, both read as false after
//! every non-ADD instruction. PUSH and POP compute the new stack pointer
//! through the ALU (`ADD(SP, ±1)`) and therefore clobber the PSR like any
//! other non-jump instruction.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alu::{self, AluInput, AluOp};
use crate::bits;
use crate::decode::{DecodedInstr, OpCode, OpType};
use crate::error::ExecutorError;
use crate::memory::Memory;
use crate::registers::{gpr, Psr, Registers};
use crate::syscall;
use crate::trace::{TraceLevel, Tracer};
use crate::Word;

/// Segment registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegReg {
    Cs,
    Ds,
    Ss,
    Es,
}

impl SegReg {
    pub fn name(self) -> &'static str {
        match self {
            Self::Cs => "Code Segment",
            Self::Ds => "Data Segment",
            Self::Ss => "Stack Segment",
            Self::Es => "Extra Segment",
        }
    }
}

/// An inclusive address range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRange {
    pub start: Word,
    pub end: Word,
}

impl SegmentRange {
    pub fn new(start: Word, end: Word) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn contains(&self, addr: Word) -> bool {
        addr >= self.start && addr <= self.end
    }

    /// Number of words covered.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false // an inclusive range always covers at least one word
    }
}

/// The four memory segments. All four are always present; the loader
/// synthesises SS when the program file leaves it implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMap {
    pub cs: SegmentRange,
    pub ds: SegmentRange,
    pub ss: SegmentRange,
    pub es: SegmentRange,
}

impl SegmentMap {
    /// Segments in trace order.
    pub fn iter(&self) -> [(SegReg, SegmentRange); 4] {
        [
            (SegReg::Cs, self.cs),
            (SegReg::Ds, self.ds),
            (SegReg::Ss, self.ss),
            (SegReg::Es, self.es),
        ]
    }

    pub fn get(&self, seg: SegReg) -> SegmentRange {
        match seg {
            SegReg::Cs => self.cs,
            SegReg::Ds => self.ds,
            SegReg::Ss => self.ss,
            SegReg::Es => self.es,
        }
    }
}

/// Validate a segment configuration against a memory size.
///
/// Invariants: each range ordered and inside memory, ranges pairwise
/// disjoint, total coverage no larger than memory.
pub fn validate_segments(segments: &SegmentMap, mem_size: usize) -> Result<(), ExecutorError> {
    let mut ranges = vec![segments.cs, segments.ds, segments.ss, segments.es];

    for range in &ranges {
        if range.start > range.end || range.end as usize >= mem_size {
            return Err(ExecutorError::SegmentMisconfig {
                reason: "segment range inverted or outside memory",
            });
        }
    }

    ranges.sort_by_key(|r| r.start);
    for pair in ranges.windows(2) {
        if pair[0].end >= pair[1].start {
            return Err(ExecutorError::SegmentMisconfig {
                reason: "segment ranges overlap",
            });
        }
    }

    let total: usize = ranges.iter().map(SegmentRange::len).sum();
    if total > mem_size {
        return Err(ExecutorError::SegmentMisconfig {
            reason: "segment ranges exceed memory capacity",
        });
    }
    Ok(())
}

/// The simulator core.
#[derive(Debug)]
pub struct Core<'t> {
    memory: Memory,
    registers: Registers,
    segments: SegmentMap,
    tracer: Option<&'t mut Tracer>,
}

impl<'t> Core<'t> {
    /// Build a core without a tracer.
    pub fn new(mem_size: usize, segments: SegmentMap) -> Result<Self, ExecutorError> {
        Self::build(mem_size, segments, None)
    }

    /// Build a core that records every retired instruction into `tracer`.
    pub fn with_tracer(
        mem_size: usize,
        segments: SegmentMap,
        tracer: &'t mut Tracer,
    ) -> Result<Self, ExecutorError> {
        Self::build(mem_size, segments, Some(tracer))
    }

    fn build(
        mem_size: usize,
        segments: SegmentMap,
        mut tracer: Option<&'t mut Tracer>,
    ) -> Result<Self, ExecutorError> {
        if let Err(err) = validate_segments(&segments, mem_size) {
            if let Some(t) = tracer.as_deref_mut() {
                let _ = t.log(TraceLevel::Error, &err.to_string());
            }
            return Err(err);
        }

        let mut registers = Registers::new();
        *registers.gp_mut(gpr::SP) = segments.ss.end.wrapping_add(1);
        *registers.gp_mut(gpr::PC) = segments.cs.start;

        Ok(Self {
            memory: Memory::new(mem_size),
            registers,
            segments,
            tracer,
        })
    }

    /// Copy instruction words into the code segment, starting at its base.
    /// Words past the segment end are dropped.
    pub fn load_instructions(&mut self, words: &[Word]) {
        Self::load_into(&mut self.memory, self.segments.cs, words);
    }

    /// Copy data words into the data segment, starting at its base.
    pub fn load_data(&mut self, words: &[Word]) {
        Self::load_into(&mut self.memory, self.segments.ds, words);
    }

    fn load_into(memory: &mut Memory, seg: SegmentRange, words: &[Word]) {
        for (offset, &word) in words.iter().enumerate() {
            let addr = seg.start.wrapping_add(offset as Word);
            if addr > seg.end {
                break;
            }
            let _ = memory.write(addr, word);
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Mutable register access for host-side setup (tests, benchmarks,
    /// embedders preloading argument registers).
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn segments(&self) -> &SegmentMap {
        &self.segments
    }

    /// Run until the all-ones terminator word is fetched or a fatal
    /// condition surfaces.
    pub fn run(&mut self) -> Result<(), ExecutorError> {
        loop {
            let binary = self.fetch()?;

            if bits::test_bit_all(binary) {
                debug!(pc = self.registers.gp(gpr::PC), "terminator fetched");
                return Ok(());
            }

            let instr = DecodedInstr::decode(binary);

            if self.check_jump(&instr)? {
                self.trace(binary, &instr)?;
                continue;
            }

            let result = self.execute(&instr)?;
            self.memory_access(&instr, result)?;
            self.trace(binary, &instr)?;
        }
    }

    /// Log a fatal condition through the tracer (if any) and return it.
    fn fail<T>(&mut self, err: ExecutorError) -> Result<T, ExecutorError> {
        if let Some(t) = self.tracer.as_deref_mut() {
            let _ = t.log(TraceLevel::Error, &err.to_string());
        }
        Err(err)
    }

    fn trace(&mut self, binary: Word, instr: &DecodedInstr) -> Result<(), ExecutorError> {
        if let Some(t) = self.tracer.as_deref_mut() {
            t.record(binary, instr, &self.memory, &self.registers, &self.segments)?;
        }
        Ok(())
    }

    /// Fetch the word at PC and advance PC by one. PC must lie in CS.
    fn fetch(&mut self) -> Result<Word, ExecutorError> {
        let pc = self.registers.gp(gpr::PC);
        if !self.segments.cs.contains(pc) {
            return self.fail(ExecutorError::PcOutOfCodeSegment { pc });
        }
        let word = match self.memory.read(pc) {
            Ok(word) => word,
            Err(err) => return self.fail(err),
        };
        *self.registers.gp_mut(gpr::PC) = pc.wrapping_add(1);
        Ok(word)
    }

    /// Handle J-type instructions. Returns false when the instruction is not
    /// J-type and must continue to the ALU path.
    fn check_jump(&mut self, instr: &DecodedInstr) -> Result<bool, ExecutorError> {
        if instr.op_type != OpType::J as u8 {
            return Ok(false);
        }

        let code = match OpCode::from_u8(instr.op_code) {
            Some(code) => code,
            None => {
                return self.fail(ExecutorError::UnknownOpCode {
                    code: instr.op_code,
                })
            }
        };

        let taken = match code {
            OpCode::Jmp => true,
            OpCode::Jz => self.registers.psr(Psr::Z),
            OpCode::Jn => self.registers.psr(Psr::N),
            OpCode::Jc => self.registers.psr(Psr::C),
            OpCode::Jv => self.registers.psr(Psr::V),
            OpCode::Jzn => self.registers.psr(Psr::Z) || self.registers.psr(Psr::N),
            OpCode::Syscall => {
                let number = instr.imm as u32;
                match syscall::dispatch(number, &mut self.memory, &mut self.registers) {
                    Ok(()) => return Ok(true),
                    Err(err) => return self.fail(err),
                }
            }
            _ => {
                return self.fail(ExecutorError::UnknownOpCode {
                    code: instr.op_code,
                })
            }
        };

        if taken {
            *self.registers.gp_mut(gpr::PC) = instr.imm as Word;
        }
        Ok(true)
    }

    /// Build the ALU input for a non-jump instruction.
    fn generate_alu_input(&mut self, instr: &DecodedInstr) -> Result<AluInput, ExecutorError> {
        let code = match OpCode::from_u8(instr.op_code) {
            Some(code) => code,
            None => {
                return self.fail(ExecutorError::UnknownOpCode {
                    code: instr.op_code,
                })
            }
        };

        let op = match code {
            OpCode::Add => AluOp::Add,
            OpCode::Umul => AluOp::Umul,
            OpCode::Udiv => AluOp::Udiv,
            OpCode::Umol => AluOp::Umol,
            OpCode::And => AluOp::And,
            OpCode::Orr => AluOp::Orr,
            OpCode::Xor => AluOp::Xor,
            OpCode::Shl => AluOp::Shl,
            OpCode::Shr => AluOp::Shr,
            OpCode::Rtl => AluOp::Rtl,
            OpCode::Rtr => AluOp::Rtr,
            // Unary forms use only the first operand.
            OpCode::Not => {
                return Ok(AluInput {
                    op: AluOp::Comp,
                    a: self.registers.gp(instr.rm),
                    b: 0,
                })
            }
            // The ALU computes the effective address by passing Rm through.
            OpCode::Ldr | OpCode::Str => {
                return Ok(AluInput {
                    op: AluOp::Pass,
                    a: self.registers.gp(instr.rm),
                    b: 0,
                })
            }
            OpCode::Push => {
                return Ok(AluInput {
                    op: AluOp::Add,
                    a: self.registers.gp(gpr::SP),
                    b: 1u32.wrapping_neg(),
                })
            }
            OpCode::Pop => {
                return Ok(AluInput {
                    op: AluOp::Add,
                    a: self.registers.gp(gpr::SP),
                    b: 1,
                })
            }
            // Jump opcodes never reach the ALU path.
            OpCode::Jmp
            | OpCode::Jz
            | OpCode::Jn
            | OpCode::Jc
            | OpCode::Jv
            | OpCode::Jzn
            | OpCode::Syscall => {
                return self.fail(ExecutorError::UnknownOpCode {
                    code: instr.op_code,
                })
            }
        };

        // Binary opcodes take their second operand from Rn or the immediate.
        match OpType::from_u8(instr.op_type) {
            Some(OpType::R) => Ok(AluInput {
                op,
                a: self.registers.gp(instr.rm),
                b: self.registers.gp(instr.rn),
            }),
            Some(OpType::I) => Ok(AluInput {
                op,
                a: self.registers.gp(instr.rm),
                b: instr.imm as Word,
            }),
            _ => self.fail(ExecutorError::UnknownOpType {
                raw: instr.op_type,
            }),
        }
    }

    /// Run the ALU and replace the PSR with the flags it produced.
    fn execute(&mut self, instr: &DecodedInstr) -> Result<Word, ExecutorError> {
        let input = self.generate_alu_input(instr)?;
        let output = alu::execute(input);
        self.registers.replace_psr(output.flags);
        Ok(output.result)
    }

    /// Memory access and writeback for the ALU result `value`.
    fn memory_access(&mut self, instr: &DecodedInstr, value: Word) -> Result<(), ExecutorError> {
        match OpCode::from_u8(instr.op_code) {
            Some(OpCode::Ldr) => {
                let loaded = match self.memory.read(value) {
                    Ok(word) => word,
                    Err(err) => return self.fail(err),
                };
                *self.registers.gp_mut(instr.rd) = loaded;
            }
            Some(OpCode::Str) => {
                let stored = self.registers.gp(instr.rd);
                if let Err(err) = self.memory.write(value, stored) {
                    return self.fail(err);
                }
            }
            Some(OpCode::Push) => {
                if !self.segments.ss.contains(value) {
                    return self.fail(ExecutorError::StackOverflow { addr: value });
                }
                let pushed = self.registers.gp(instr.rd);
                if let Err(err) = self.memory.write(value, pushed) {
                    return self.fail(err);
                }
                *self.registers.gp_mut(gpr::SP) = value;
            }
            Some(OpCode::Pop) => {
                // Only the decremented target is checked, mirroring PUSH's
                // post-condition; popping past the stack top is a no-op.
                if !self.segments.ss.contains(value.wrapping_sub(1)) {
                    debug!(sp = value, "pop outside the stack segment ignored");
                    return Ok(());
                }
                let sp = self.registers.gp(gpr::SP);
                let popped = match self.memory.read(sp) {
                    Ok(word) => word,
                    Err(err) => return self.fail(err),
                };
                *self.registers.gp_mut(instr.rd) = popped;
                *self.registers.gp_mut(gpr::SP) = value;
            }
            _ => {
                // Arithmetic, logic, shifts, rotates, NOT: plain writeback.
                *self.registers.gp_mut(instr.rd) = value;
            }
        }
        Ok(())
    }
}
