//! End-to-end programs run through the full fetch/decode/execute loop.

use absm_executor::decode::{
    assemble_i, assemble_j, assemble_r, assemble_s, assemble_u, TERMINATOR,
};
use absm_executor::registers::gpr;
use absm_executor::syscall::console_out_to;
use absm_executor::{load_program, Core, OpCode, Psr, SegmentMap, SegmentRange, Word};

const MEM_SIZE: usize = 50;

fn segments() -> SegmentMap {
    SegmentMap {
        cs: SegmentRange::new(0, 24),
        ss: SegmentRange::new(25, 30),
        ds: SegmentRange::new(31, 47),
        es: SegmentRange::new(48, 48),
    }
}

fn fresh_core() -> Core<'static> {
    Core::new(MEM_SIZE, segments()).unwrap()
}

#[test]
fn literal_add() {
    let mut core = fresh_core();
    core.load_instructions(&[assemble_i(OpCode::Add, gpr::R1, gpr::R1, 1), TERMINATOR]);
    core.run().unwrap();

    assert_eq!(core.registers().gp(gpr::R1), 1);
    // PC sits one past the terminator it fetched.
    assert_eq!(core.registers().gp(gpr::PC), 2);
}

#[test]
fn hello_world_via_console_out() {
    let message = b"hello world";
    let data: Vec<Word> = message.iter().map(|&b| b as Word).collect();

    let mut core = fresh_core();
    core.load_data(&data);
    core.load_instructions(&[
        assemble_i(OpCode::Add, gpr::R0, gpr::R0, 31), // R0 = DS.start
        assemble_i(OpCode::Add, gpr::R1, gpr::R1, 11), // R1 = length
        assemble_j(OpCode::Syscall, 1),
        TERMINATOR,
    ]);
    core.run().unwrap();

    // The registers reflect the loads and the data memory is untouched.
    assert_eq!(core.registers().gp(gpr::R0), 31);
    assert_eq!(core.registers().gp(gpr::R1), 11);
    for (i, &b) in message.iter().enumerate() {
        assert_eq!(core.memory().read(31 + i as Word).unwrap(), b as Word);
    }

    // The console handler itself produces exactly the message.
    let mut out = Vec::new();
    console_out_to(&mut out, core.memory(), core.registers()).unwrap();
    assert_eq!(out, message);
}

#[test]
fn conditional_jump_on_zero() {
    // R3 = 5 + (-5) sets Z; JZ must skip the instruction that would set R5.
    let mut core = fresh_core();
    core.load_instructions(&[
        assemble_i(OpCode::Add, gpr::R1, gpr::R1, 5), // R1 = 5
        assemble_u(OpCode::Not, gpr::R2, gpr::R1),    // R2 = !5
        assemble_i(OpCode::Add, gpr::R2, gpr::R2, 1), // R2 = -5
        assemble_r(OpCode::Add, gpr::R3, gpr::R1, gpr::R2), // R3 = 0, Z set
        assemble_j(OpCode::Jz, 6),
        assemble_i(OpCode::Add, gpr::R5, gpr::R5, 1), // skipped
        TERMINATOR,
    ]);
    core.run().unwrap();

    assert_eq!(core.registers().gp(gpr::R3), 0);
    assert!(core.registers().psr(Psr::Z));
    assert_eq!(core.registers().gp(gpr::R5), 0);
    assert_eq!(core.registers().gp(gpr::PC), 7);
}

#[test]
fn stack_roundtrip() {
    let mut core = fresh_core();
    *core.registers_mut().gp_mut(gpr::R3) = 0x1234;
    *core.registers_mut().gp_mut(gpr::R4) = 0x5678;
    core.load_instructions(&[
        assemble_s(OpCode::Push, gpr::R3),
        assemble_s(OpCode::Push, gpr::R4),
        assemble_s(OpCode::Pop, gpr::R5),
        assemble_s(OpCode::Pop, gpr::R6),
        TERMINATOR,
    ]);

    let sp_before = core.registers().gp(gpr::SP);
    core.run().unwrap();

    assert_eq!(core.registers().gp(gpr::R5), 0x5678);
    assert_eq!(core.registers().gp(gpr::R6), 0x1234);
    assert_eq!(core.registers().gp(gpr::SP), sp_before);
}

#[test]
fn division_by_zero_recovers() {
    let mut core = fresh_core();
    *core.registers_mut().gp_mut(gpr::R1) = 100;
    core.load_instructions(&[
        assemble_r(OpCode::Udiv, gpr::R3, gpr::R1, gpr::R2), // R2 = 0
        assemble_i(OpCode::Add, gpr::R4, gpr::R3, 7),
        TERMINATOR,
    ]);
    core.run().unwrap();

    assert_eq!(core.registers().gp(gpr::R3), 0);
    assert_eq!(core.registers().gp(gpr::R4), 7);
}

#[test]
fn division_by_zero_leaves_flags_empty() {
    let mut core = fresh_core();
    *core.registers_mut().gp_mut(gpr::R1) = 100;
    core.load_instructions(&[
        assemble_r(OpCode::Udiv, gpr::R3, gpr::R1, gpr::R2),
        TERMINATOR,
    ]);
    core.run().unwrap();

    // Result 0, yet no Z: the default ALU output carries no flags.
    assert_eq!(core.registers().psr_value(), Psr::empty());
}

#[test]
fn modulus_runs_and_wraps_into_flags() {
    let mut core = fresh_core();
    *core.registers_mut().gp_mut(gpr::R1) = 100;
    *core.registers_mut().gp_mut(gpr::R2) = 7;
    core.load_instructions(&[
        assemble_r(OpCode::Umol, gpr::R3, gpr::R1, gpr::R2),
        TERMINATOR,
    ]);
    core.run().unwrap();
    assert_eq!(core.registers().gp(gpr::R3), 2);
    assert!(!core.registers().psr(Psr::Z));
}

#[test]
fn shift_and_rotate_compose() {
    // Build 0x1234 from small immediates: 0x12 << 8 | 0x34.
    let mut core = fresh_core();
    core.load_instructions(&[
        assemble_i(OpCode::Add, gpr::R1, gpr::R1, 0x12),
        assemble_i(OpCode::Shl, gpr::R1, gpr::R1, 8),
        assemble_i(OpCode::Orr, gpr::R1, gpr::R1, 0x34),
        assemble_i(OpCode::Rtl, gpr::R2, gpr::R1, 16),
        assemble_i(OpCode::Rtr, gpr::R3, gpr::R2, 16),
        TERMINATOR,
    ]);
    core.run().unwrap();

    assert_eq!(core.registers().gp(gpr::R1), 0x1234);
    assert_eq!(core.registers().gp(gpr::R2), 0x1234_0000);
    assert_eq!(core.registers().gp(gpr::R3), 0x1234);
}

#[test]
fn loader_feeds_the_core() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("program.bin");
    std::fs::write(
        &path,
        format!(
            "; literal add\n\
             ts\n0 24\n\
             ds\n31 47\n\
             es\n48 48\n\
             td\n{}\n{}\n",
            assemble_i(OpCode::Add, gpr::R1, gpr::R1, 1),
            TERMINATOR
        ),
    )
    .unwrap();

    let program = load_program(&path, MEM_SIZE).unwrap();
    assert_eq!(program.segments.ss, SegmentRange::new(49, 49));

    let mut core = Core::new(MEM_SIZE, program.segments).unwrap();
    core.load_instructions(&program.instructions);
    core.load_data(&program.data);
    core.run().unwrap();
    assert_eq!(core.registers().gp(gpr::R1), 1);
}

#[test]
fn loader_segment_synthesis_matches_layout() {
    let text = "ds\n31 47\nes\n48 48\nts\n0 24\ndd\n104\ntd\n255\n";
    let program = absm_executor::loader::parse_program(text, MEM_SIZE).unwrap();
    assert_eq!(program.data, vec![104]);
    assert_eq!(program.instructions, vec![255]);
    assert_eq!(program.segments.ds, SegmentRange::new(31, 47));
    assert_eq!(program.segments.es, SegmentRange::new(48, 48));
    assert_eq!(program.segments.cs, SegmentRange::new(0, 24));
    assert_eq!(program.segments.ss, SegmentRange::new(49, 49));
}

#[test]
fn welcome_syscall_dispatches() {
    let mut core = fresh_core();
    core.load_instructions(&[assemble_j(OpCode::Syscall, 0), TERMINATOR]);
    core.run().unwrap();
}

#[test]
fn countdown_loop_terminates() {
    // R1 counts down from 5; JZ exits the loop once the count hits zero.
    let mut core = fresh_core();
    *core.registers_mut().gp_mut(gpr::R1) = 5;
    *core.registers_mut().gp_mut(gpr::R2) = 1u32.wrapping_neg();
    core.load_instructions(&[
        // loop body: R3 += 1
        assemble_i(OpCode::Add, gpr::R3, gpr::R3, 1), // 0
        assemble_r(OpCode::Add, gpr::R1, gpr::R1, gpr::R2), // 1: R1 -= 1
        assemble_j(OpCode::Jz, 4),                    // 2: exit once zero
        assemble_j(OpCode::Jmp, 0),                   // 3: back to body
        TERMINATOR,                                   // 4
    ]);
    core.run().unwrap();

    assert_eq!(core.registers().gp(gpr::R3), 5);
    assert_eq!(core.registers().gp(gpr::R1), 0);
}
