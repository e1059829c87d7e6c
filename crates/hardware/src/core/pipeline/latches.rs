//! Pipeline latch structures for inter-stage communication.
//!
//! This module defines the per-instruction entries that flow between the
//! frontend (Fetch1 -> Fetch2 -> Decode -> Rename) and the backend stages
//! shared by every execution engine (Issue -> Execute -> Memory1 -> Memory2
//! -> Writeback -> Commit). Each stage takes a `Vec<PrevEntry>` and produces
//! a `Vec<NextEntry>`; there is no separate latch wrapper type, so a stalled
//! stage simply leaves entries in its input vector for the next cycle.

use crate::common::error::{ExceptionStage, Trap};
use crate::core::pipeline::rob::RobTag;
use crate::core::pipeline::signals::ControlSignals;

/// Entry in the Fetch1 -> Fetch2 latch.
///
/// Carries the physical address resolved by the I-TLB and the branch
/// prediction made from the opcode peeked at in Fetch1.
#[derive(Clone, Default, Debug)]
pub struct Fetch1Fetch2Entry {
    /// Program counter of the instruction.
    pub pc: u64,
    /// Physical address of the instruction (0 if a trap occurred).
    pub paddr: u64,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Trap that occurred during fetch (misaligned PC, I-TLB fault), if any.
    pub trap: Option<Trap>,
    /// Pipeline stage the trap was raised in.
    pub exception_stage: Option<ExceptionStage>,
    /// Global branch history snapshot taken at prediction time, restored on
    /// misprediction so the predictor's history does not double-count the
    /// speculated outcome.
    pub ghr_snapshot: u64,
}

/// Entry in the Fetch2 -> Decode latch (I-cache result, RVC-expanded).
#[derive(Clone, Default, Debug)]
pub struct IfIdEntry {
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding (already expanded if originally compressed).
    pub inst: u32,
    /// Size of the original instruction in bytes (2 for compressed, 4 for standard).
    pub inst_size: u64,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Trap that occurred during fetch, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage the trap was raised in.
    pub exception_stage: Option<ExceptionStage>,
    /// Global branch history snapshot taken at prediction time, carried
    /// through to execute for misprediction repair.
    pub ghr_snapshot: u64,
}

/// Entry in the Decode -> Rename latch.
///
/// Contains decoded instruction information, including register indices,
/// immediate values, and control signals.
#[derive(Clone, Default, Debug)]
pub struct IdExEntry {
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// First source register index (rs1).
    pub rs1: usize,
    /// Second source register index (rs2).
    pub rs2: usize,
    /// Third source register index (rs3, for FMA-family instructions).
    pub rs3: usize,
    /// Destination register index (rd).
    pub rd: usize,
    /// Sign-extended immediate value.
    pub imm: i64,
    /// Value read from rs1 register (unused until issue; always 0 here).
    pub rv1: u64,
    /// Value read from rs2 register (unused until issue; always 0 here).
    pub rv2: u64,
    /// Value read from rs3 register (unused until issue; always 0 here).
    pub rv3: u64,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap that occurred during fetch or decode, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage the trap was raised in.
    pub exception_stage: Option<ExceptionStage>,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Global branch history snapshot at fetch time, for misprediction repair.
    pub ghr_snapshot: u64,
}

/// Entry in the Rename -> Issue latch.
///
/// Produced by the rename stage after ROB/store-buffer allocation and
/// scoreboard bookkeeping. Source operand values are not read here — the
/// issue stage fills `rv1`/`rv2`/`rv3` once operands are ready.
#[derive(Clone, Default, Debug)]
pub struct RenameIssueEntry {
    /// ROB slot this instruction was allocated.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// First source register index (rs1).
    pub rs1: usize,
    /// Second source register index (rs2).
    pub rs2: usize,
    /// Third source register index (rs3).
    pub rs3: usize,
    /// Destination register index (rd).
    pub rd: usize,
    /// Sign-extended immediate value.
    pub imm: i64,
    /// Value read from rs1 (filled at issue).
    pub rv1: u64,
    /// Value read from rs2 (filled at issue).
    pub rv2: u64,
    /// Value read from rs3 (filled at issue).
    pub rv3: u64,
    /// Producer ROB tag for rs1 captured at rename time, or `None` if the
    /// architectural register file already held the value.
    pub rs1_tag: Option<RobTag>,
    /// Producer ROB tag for rs2 captured at rename time.
    pub rs2_tag: Option<RobTag>,
    /// Producer ROB tag for rs3 captured at rename time.
    pub rs3_tag: Option<RobTag>,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap that occurred upstream of execute, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage the trap was raised in.
    pub exception_stage: Option<ExceptionStage>,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Global branch history snapshot at fetch time, for misprediction repair.
    pub ghr_snapshot: u64,
}

/// Entry in the Execute -> Memory1 latch.
#[derive(Clone, Default, Debug)]
pub struct ExMem1Entry {
    /// ROB slot this instruction occupies.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// Destination register index (rd).
    pub rd: usize,
    /// ALU computation result, or the effective address for memory ops.
    pub alu: u64,
    /// Data to be stored (for store/AMO instructions).
    pub store_data: u64,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap raised during execute, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage the trap was raised in.
    pub exception_stage: Option<ExceptionStage>,
}

/// Entry in the Memory1 -> Memory2 latch (post address-translation).
#[derive(Clone, Default, Debug)]
pub struct Mem1Mem2Entry {
    /// ROB slot this instruction occupies.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// Destination register index (rd).
    pub rd: usize,
    /// ALU result for non-memory instructions (passed through to writeback).
    pub alu: u64,
    /// Virtual address (for loads/stores).
    pub vaddr: u64,
    /// Translated physical address (for loads/stores).
    pub paddr: u64,
    /// Data to be stored (for store/AMO instructions).
    pub store_data: u64,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap raised during translation, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage the trap was raised in.
    pub exception_stage: Option<ExceptionStage>,
}

/// Entry in the Memory2 -> Writeback latch.
#[derive(Clone, Default, Debug)]
pub struct Mem2WbEntry {
    /// ROB slot this instruction occupies.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// Destination register index (rd).
    pub rd: usize,
    /// ALU computation result (for non-load instructions).
    pub alu: u64,
    /// Data loaded from memory or forwarded from the store buffer.
    pub load_data: u64,
    /// Control signals for the writeback stage.
    pub ctrl: ControlSignals,
    /// Trap raised during the memory stages, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage the trap was raised in.
    pub exception_stage: Option<ExceptionStage>,
}
