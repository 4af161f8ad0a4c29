//! Architectural-state tracer.
//!
//! A `Tracer` owns a log file and is lent to the core for the duration of a
//! run. It records two kinds of entries: leveled run messages (an ERROR
//! entry is flushed immediately, since the run is about to abort) and one
//! CSV-style record per retired instruction with the raw word, the decoded
//! fields, every register, and the contents of each memory segment.
//!
//! The tracer observes state but never mutates it: a run with a tracer
//! attached retires exactly the same architectural states as one without.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cpu::SegmentMap;
use crate::decode::{DecodedInstr, OpCode, OpType};
use crate::error::ExecutorError;
use crate::memory::Memory;
use crate::registers::{Psr, Registers, GP_NAMES};
use crate::Word;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLevel {
    Info,
    Warning,
    Error,
}

impl TraceLevel {
    fn prefix(self) -> &'static str {
        match self {
            Self::Info => "INFO: ",
            Self::Warning => "WARNING: ",
            Self::Error => "ERROR: ",
        }
    }
}

#[derive(Debug)]
pub struct Tracer {
    sink: BufWriter<File>,
    instruction_count: u32,
}

impl Tracer {
    /// Create (or truncate) the log file at `path`.
    pub fn create(path: &Path) -> Result<Self, ExecutorError> {
        let file = File::create(path)?;
        Ok(Self {
            sink: BufWriter::new(file),
            instruction_count: 0,
        })
    }

    /// Append a leveled message. ERROR entries are flushed to disk before
    /// returning so the log survives the abort that follows.
    pub fn log(&mut self, level: TraceLevel, message: &str) -> Result<(), ExecutorError> {
        writeln!(self.sink, "{}{}", level.prefix(), message)?;
        if level == TraceLevel::Error {
            self.sink.flush()?;
        }
        Ok(())
    }

    /// Append one per-instruction record.
    pub fn record(
        &mut self,
        binary: Word,
        instr: &DecodedInstr,
        memory: &Memory,
        registers: &Registers,
        segments: &SegmentMap,
    ) -> Result<(), ExecutorError> {
        self.heading(binary)?;
        self.instruction(instr)?;
        self.registers(registers)?;
        self.memory(memory, segments)?;
        writeln!(self.sink)?;
        self.instruction_count += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn instruction_count(&self) -> u32 {
        self.instruction_count
    }

    /// Flush buffered output to disk.
    pub fn flush(&mut self) -> Result<(), ExecutorError> {
        self.sink.flush()?;
        Ok(())
    }

    fn heading(&mut self, binary: Word) -> Result<(), ExecutorError> {
        writeln!(
            self.sink,
            "Instruction #{}, 0x{:08x}",
            self.instruction_count, binary
        )?;
        Ok(())
    }

    fn instruction(&mut self, instr: &DecodedInstr) -> Result<(), ExecutorError> {
        let reg_name = |index: u8| GP_NAMES.get(index as usize).copied().unwrap_or("?");
        writeln!(self.sink, "OpType,OpCode,Rd,Rm,Rn,Imm")?;
        writeln!(
            self.sink,
            "{},{},{},{},{},{}",
            OpType::from_u8(instr.op_type).map_or("?", OpType::name),
            OpCode::from_u8(instr.op_code).map_or("?", OpCode::name),
            reg_name(instr.rd),
            reg_name(instr.rm),
            reg_name(instr.rn),
            instr.imm
        )?;
        Ok(())
    }

    fn registers(&mut self, registers: &Registers) -> Result<(), ExecutorError> {
        writeln!(self.sink, "{}", GP_NAMES.join(","))?;
        let values: Vec<String> = (0u8..16).map(|i| registers.gp(i).to_string()).collect();
        writeln!(self.sink, "{}", values.join(","))?;

        writeln!(self.sink, "N,Z,C,V")?;
        writeln!(
            self.sink,
            "{},{},{},{}",
            u8::from(registers.psr(Psr::N)),
            u8::from(registers.psr(Psr::Z)),
            u8::from(registers.psr(Psr::C)),
            u8::from(registers.psr(Psr::V))
        )?;
        Ok(())
    }

    fn memory(&mut self, memory: &Memory, segments: &SegmentMap) -> Result<(), ExecutorError> {
        for (seg, range) in segments.iter() {
            writeln!(self.sink, "{}", seg.name())?;
            let words: Vec<String> = (range.start..=range.end)
                .map(|addr| memory.read(addr).unwrap_or(0).to_string())
                .collect();
            writeln!(self.sink, "{}", words.join(","))?;
        }
        Ok(())
    }
}
