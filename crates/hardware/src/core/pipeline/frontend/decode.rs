//! Decode stage: converts fetched instructions into control signals.
//!
//! Consumes `IfIdEntry` (raw instruction, already RVC-expanded by Fetch2) and
//! produces `IdExEntry`, filling in register indices, the sign-extended
//! immediate, and the `ControlSignals`/`AluOp` that drive every later stage.
//! Traps raised upstream (misaligned fetch, I-TLB fault) pass through
//! untouched; an unrecognised opcode raises `IllegalInstruction` here.

use crate::common::error::{ExceptionStage, Trap};
use crate::core::Cpu;
use crate::core::pipeline::latches::{IdExEntry, IfIdEntry};
use crate::core::pipeline::signals::{AluOp, AtomicOp, ControlSignals, CsrOp, MemWidth, OpASrc, OpBSrc};
use crate::isa::decode::decode as decode_fields;
use crate::isa::instruction::{Decoded, InstructionBits};
use crate::isa::privileged::opcodes as sys_op;
use crate::isa::rv64a::{funct3 as a_f3, funct5 as a_f5, opcodes as a_op};
use crate::isa::rv64d::funct7 as d_f7;
use crate::isa::rv64f::{funct3 as f_f3, funct7 as f_f7, opcodes as f_op};
use crate::isa::rv64i::{funct3 as i_f3, funct7 as i_f7, opcodes as i_op};
use crate::isa::rv64m::{funct3 as m_f3, opcodes as m_op};

/// Executes the Decode stage: IfIdEntry -> IdExEntry.
///
/// Consumes Fetch2->Decode entries and produces Decode->Rename entries.
pub fn decode_stage(cpu: &mut Cpu, input: &mut Vec<IfIdEntry>, output: &mut Vec<IdExEntry>) {
    let entries = std::mem::take(input);
    output.clear();

    for e in entries {
        let entry = decode_one(e);
        if cpu.trace {
            eprintln!(
                "DE  pc={:#x} inst={:#010x} illegal={}",
                entry.pc,
                entry.inst,
                entry.trap.is_some()
            );
        }
        output.push(entry);
    }
}

fn decode_one(e: IfIdEntry) -> IdExEntry {
    if e.trap.is_some() {
        return IdExEntry {
            pc: e.pc,
            inst: e.inst,
            inst_size: e.inst_size,
            rs1: 0,
            rs2: 0,
            rs3: 0,
            rd: 0,
            imm: 0,
            rv1: 0,
            rv2: 0,
            rv3: 0,
            ctrl: ControlSignals::default(),
            trap: e.trap,
            exception_stage: e.exception_stage,
            pred_taken: e.pred_taken,
            pred_target: e.pred_target,
            ghr_snapshot: e.ghr_snapshot,
        };
    }

    let d = decode_fields(e.inst);
    let rs3 = InstructionBits::rs3(&e.inst);

    let (ctrl, illegal) = build_control(&d);

    let trap = if illegal {
        Some(Trap::IllegalInstruction(e.inst))
    } else {
        None
    };
    let exception_stage = if illegal { Some(ExceptionStage::Decode) } else { None };

    IdExEntry {
        pc: e.pc,
        inst: e.inst,
        inst_size: e.inst_size,
        rs1: d.rs1,
        rs2: d.rs2,
        rs3,
        rd: d.rd,
        imm: d.imm,
        rv1: 0,
        rv2: 0,
        rv3: 0,
        ctrl,
        trap,
        exception_stage,
        pred_taken: e.pred_taken,
        pred_target: e.pred_target,
        ghr_snapshot: e.ghr_snapshot,
    }
}

/// Builds `ControlSignals` for a decoded instruction. Returns `(signals, illegal)`.
fn build_control(d: &Decoded) -> (ControlSignals, bool) {
    let mut c = ControlSignals::default();
    let f3 = d.funct3;
    let f7 = d.funct7;

    match d.opcode {
        i_op::OP_REG | i_op::OP_REG_32 => {
            c.reg_write = true;
            c.a_src = OpASrc::Reg1;
            c.b_src = OpBSrc::Reg2;
            c.is_rv32 = d.opcode == i_op::OP_REG_32;

            if f7 == m_op::M_EXTENSION {
                c.alu = match f3 {
                    m_f3::MUL => AluOp::Mul,
                    m_f3::MULH => AluOp::Mulh,
                    m_f3::MULHSU => AluOp::Mulhsu,
                    m_f3::MULHU => AluOp::Mulhu,
                    m_f3::DIV => AluOp::Div,
                    m_f3::DIVU => AluOp::Divu,
                    m_f3::REM => AluOp::Rem,
                    m_f3::REMU => AluOp::Remu,
                    _ => return illegal_signals(),
                };
                return (c, false);
            }

            c.alu = match (f3, f7) {
                (i_f3::ADD_SUB, i_f7::DEFAULT) => AluOp::Add,
                (i_f3::ADD_SUB, i_f7::SUB) => AluOp::Sub,
                (i_f3::SLL, i_f7::DEFAULT) => AluOp::Sll,
                (i_f3::SLT, i_f7::DEFAULT) => AluOp::Slt,
                (i_f3::SLTU, i_f7::DEFAULT) => AluOp::Sltu,
                (i_f3::XOR, i_f7::DEFAULT) => AluOp::Xor,
                (i_f3::SRL_SRA, i_f7::DEFAULT) => AluOp::Srl,
                (i_f3::SRL_SRA, i_f7::SRA) => AluOp::Sra,
                (i_f3::OR, i_f7::DEFAULT) => AluOp::Or,
                (i_f3::AND, i_f7::DEFAULT) => AluOp::And,
                _ => return illegal_signals(),
            };
        }

        i_op::OP_IMM | i_op::OP_IMM_32 => {
            c.reg_write = true;
            c.a_src = OpASrc::Reg1;
            c.b_src = OpBSrc::Imm;
            c.is_rv32 = d.opcode == i_op::OP_IMM_32;

            c.alu = match f3 {
                i_f3::ADD_SUB => AluOp::Add,
                i_f3::SLT => AluOp::Slt,
                i_f3::SLTU => AluOp::Sltu,
                i_f3::XOR => AluOp::Xor,
                i_f3::OR => AluOp::Or,
                i_f3::AND => AluOp::And,
                i_f3::SLL => AluOp::Sll,
                i_f3::SRL_SRA => {
                    // The alternate-select bit sits at imm[10] regardless of
                    // whether the shift amount itself is 5 or 6 bits wide.
                    if (d.imm as u64) & (1 << 10) != 0 {
                        AluOp::Sra
                    } else {
                        AluOp::Srl
                    }
                }
                _ => return illegal_signals(),
            };
        }

        i_op::OP_LOAD => {
            c.reg_write = true;
            c.mem_read = true;
            c.a_src = OpASrc::Reg1;
            c.b_src = OpBSrc::Imm;
            c.alu = AluOp::Add;
            let (width, signed) = match f3 {
                i_f3::LB => (MemWidth::Byte, true),
                i_f3::LH => (MemWidth::Half, true),
                i_f3::LW => (MemWidth::Word, true),
                i_f3::LD => (MemWidth::Double, true),
                i_f3::LBU => (MemWidth::Byte, false),
                i_f3::LHU => (MemWidth::Half, false),
                i_f3::LWU => (MemWidth::Word, false),
                _ => return illegal_signals(),
            };
            c.width = width;
            c.signed_load = signed;
        }

        f_op::OP_LOAD_FP => {
            c.fp_reg_write = true;
            c.mem_read = true;
            c.a_src = OpASrc::Reg1;
            c.b_src = OpBSrc::Imm;
            c.alu = AluOp::Add;
            c.width = if f3 == i_f3::LW {
                MemWidth::Word
            } else {
                MemWidth::Double
            };
            c.signed_load = false;
        }

        i_op::OP_STORE => {
            c.mem_write = true;
            c.a_src = OpASrc::Reg1;
            c.b_src = OpBSrc::Reg2;
            c.alu = AluOp::Add;
            c.width = match f3 {
                i_f3::SB => MemWidth::Byte,
                i_f3::SH => MemWidth::Half,
                i_f3::SW => MemWidth::Word,
                i_f3::SD => MemWidth::Double,
                _ => return illegal_signals(),
            };
        }

        f_op::OP_STORE_FP => {
            c.mem_write = true;
            c.rs2_fp = true;
            c.a_src = OpASrc::Reg1;
            c.b_src = OpBSrc::Reg2;
            c.alu = AluOp::Add;
            c.width = if f3 == i_f3::SW {
                MemWidth::Word
            } else {
                MemWidth::Double
            };
        }

        i_op::OP_BRANCH => {
            c.branch = true;
            c.a_src = OpASrc::Reg1;
            c.b_src = OpBSrc::Reg2;
            if !matches!(
                f3,
                i_f3::BEQ | i_f3::BNE | i_f3::BLT | i_f3::BGE | i_f3::BLTU | i_f3::BGEU
            ) {
                return illegal_signals();
            }
        }

        i_op::OP_LUI => {
            c.reg_write = true;
            c.a_src = OpASrc::Zero;
            c.b_src = OpBSrc::Imm;
            c.alu = AluOp::Add;
        }

        i_op::OP_AUIPC => {
            c.reg_write = true;
            c.a_src = OpASrc::Pc;
            c.b_src = OpBSrc::Imm;
            c.alu = AluOp::Add;
        }

        i_op::OP_JAL => {
            c.reg_write = true;
            c.jump = true;
            c.a_src = OpASrc::Pc;
            c.b_src = OpBSrc::Imm;
            c.alu = AluOp::Add;
        }

        i_op::OP_JALR => {
            if f3 != 0 {
                return illegal_signals();
            }
            c.reg_write = true;
            c.jump = true;
            c.a_src = OpASrc::Reg1;
            c.b_src = OpBSrc::Imm;
            c.alu = AluOp::Add;
        }

        f_op::OP_FP => {
            if !build_fp_control(&mut c, d.raw, f3, f7) {
                return illegal_signals();
            }
        }

        f_op::OP_FMADD | f_op::OP_FMSUB | f_op::OP_FNMSUB | f_op::OP_FNMADD => {
            c.fp_reg_write = true;
            c.rs1_fp = true;
            c.rs2_fp = true;
            c.rs3_fp = true;
            c.is_rv32 = fp_is_single(f7);
            c.alu = match d.opcode {
                f_op::OP_FMADD => AluOp::FMAdd,
                f_op::OP_FMSUB => AluOp::FMSub,
                f_op::OP_FNMSUB => AluOp::FNMSub,
                f_op::OP_FNMADD => AluOp::FNMAdd,
                _ => unreachable!(),
            };
        }

        a_op::OP_AMO => {
            if !build_amo_control(&mut c, f3, f7) {
                return illegal_signals();
            }
        }

        i_op::OP_MISC_MEM => {
            if f3 == i_f3::FENCE_I {
                c.is_fence_i = true;
            }
            // Plain FENCE is a NOP for this in-order, sequentially-consistent model.
        }

        sys_op::OP_SYSTEM => {
            if !build_system_control(&mut c, d, f3) {
                return illegal_signals();
            }
        }

        _ => return illegal_signals(),
    }

    (c, false)
}

fn illegal_signals() -> (ControlSignals, bool) {
    (ControlSignals::default(), true)
}

/// `true` if the R-type funct7 format bits select single precision.
fn fp_is_single(f7: u32) -> bool {
    f7 & 0x3 == 0
}

fn build_fp_control(c: &mut ControlSignals, inst: u32, f3: u32, f7: u32) -> bool {
    let rs2 = InstructionBits::rs2(&inst);
    let is_double = matches!(
        f7,
        d_f7::FADD_D
            | d_f7::FSUB_D
            | d_f7::FMUL_D
            | d_f7::FDIV_D
            | d_f7::FSQRT_D
            | d_f7::FSGNJ_D
            | d_f7::FMIN_MAX_D
            | d_f7::FCMP_D
            | d_f7::FCLASS_MV_X_D
            | d_f7::FCVT_W_D
            | d_f7::FCVT_D_W
            | d_f7::FMV_D_X
            | d_f7::FCVT_S_D
    );
    c.is_rv32 = !is_double;

    match f7 {
        f_f7::FADD | d_f7::FADD_D => {
            c.fp_reg_write = true;
            c.rs1_fp = true;
            c.rs2_fp = true;
            c.alu = AluOp::FAdd;
        }
        f_f7::FSUB | d_f7::FSUB_D => {
            c.fp_reg_write = true;
            c.rs1_fp = true;
            c.rs2_fp = true;
            c.alu = AluOp::FSub;
        }
        f_f7::FMUL | d_f7::FMUL_D => {
            c.fp_reg_write = true;
            c.rs1_fp = true;
            c.rs2_fp = true;
            c.alu = AluOp::FMul;
        }
        f_f7::FDIV | d_f7::FDIV_D => {
            c.fp_reg_write = true;
            c.rs1_fp = true;
            c.rs2_fp = true;
            c.alu = AluOp::FDiv;
        }
        f_f7::FSQRT | d_f7::FSQRT_D => {
            c.fp_reg_write = true;
            c.rs1_fp = true;
            c.alu = AluOp::FSqrt;
        }
        f_f7::FSGNJ | d_f7::FSGNJ_D => {
            c.fp_reg_write = true;
            c.rs1_fp = true;
            c.rs2_fp = true;
            c.alu = match f3 {
                f_f3::FSGNJ => AluOp::FSgnJ,
                f_f3::FSGNJN => AluOp::FSgnJN,
                f_f3::FSGNJX => AluOp::FSgnJX,
                _ => return false,
            };
        }
        f_f7::FMIN_MAX | d_f7::FMIN_MAX_D => {
            c.fp_reg_write = true;
            c.rs1_fp = true;
            c.rs2_fp = true;
            c.alu = if f3 == f_f3::FMIN {
                AluOp::FMin
            } else {
                AluOp::FMax
            };
        }
        f_f7::FCMP | d_f7::FCMP_D => {
            c.reg_write = true;
            c.rs1_fp = true;
            c.rs2_fp = true;
            c.alu = match f3 {
                f_f3::FEQ => AluOp::FEq,
                f_f3::FLT => AluOp::FLt,
                f_f3::FLE => AluOp::FLe,
                _ => return false,
            };
        }
        f_f7::FCLASS_MV_X_F | d_f7::FCLASS_MV_X_D => {
            c.reg_write = true;
            c.rs1_fp = true;
            c.alu = if f3 == f_f3::FCLASS {
                AluOp::FClass
            } else {
                AluOp::FMvToX
            };
        }
        f_f7::FCVT_W_F | d_f7::FCVT_W_D => {
            c.reg_write = true;
            c.rs1_fp = true;
            c.alu = match rs2 {
                0 => AluOp::FCvtWS,
                1 => AluOp::FCvtWUS,
                2 => AluOp::FCvtLS,
                3 => AluOp::FCvtLUS,
                _ => return false,
            };
        }
        f_f7::FCVT_F_W | d_f7::FCVT_D_W => {
            c.fp_reg_write = true;
            c.alu = match rs2 {
                0 => AluOp::FCvtSW,
                1 => AluOp::FCvtSWU,
                2 => AluOp::FCvtSL,
                3 => AluOp::FCvtSLU,
                _ => return false,
            };
        }
        f_f7::FMV_F_X | d_f7::FMV_D_X => {
            c.fp_reg_write = true;
            c.alu = AluOp::FMvToF;
        }
        // f_f7::FCVT_DS (0x21, in the single-precision major table) encodes
        // fcvt.s.d: source is double, destination is single. compute_alu's
        // AluOp::FCvtSD arm implements exactly that direction unconditionally.
        f_f7::FCVT_DS => {
            c.fp_reg_write = true;
            c.rs1_fp = true;
            c.is_rv32 = false;
            c.alu = AluOp::FCvtSD;
        }
        // d_f7::FCVT_S_D (0x20, in the double-precision major table) encodes
        // fcvt.d.s: source is single, destination is double.
        d_f7::FCVT_S_D => {
            c.fp_reg_write = true;
            c.rs1_fp = true;
            c.is_rv32 = true;
            c.alu = AluOp::FCvtDS;
        }
        _ => return false,
    }
    true
}

fn build_amo_control(c: &mut ControlSignals, f3: u32, f7: u32) -> bool {
    c.width = match f3 {
        a_f3::WIDTH_32 => MemWidth::Word,
        a_f3::WIDTH_64 => MemWidth::Double,
        _ => return false,
    };
    c.signed_load = true;
    c.a_src = OpASrc::Reg1;
    c.b_src = OpBSrc::Reg2;
    c.alu = AluOp::Add;

    let funct5 = f7 >> 2;
    c.atomic_op = match funct5 {
        a_f5::LR => {
            c.mem_read = true;
            c.reg_write = true;
            AtomicOp::Lr
        }
        a_f5::SC => {
            c.mem_write = true;
            c.reg_write = true;
            AtomicOp::Sc
        }
        a_f5::AMOSWAP => amo_rw(c, AtomicOp::Swap),
        a_f5::AMOADD => amo_rw(c, AtomicOp::Add),
        a_f5::AMOXOR => amo_rw(c, AtomicOp::Xor),
        a_f5::AMOAND => amo_rw(c, AtomicOp::And),
        a_f5::AMOOR => amo_rw(c, AtomicOp::Or),
        a_f5::AMOMIN => amo_rw(c, AtomicOp::Min),
        a_f5::AMOMAX => amo_rw(c, AtomicOp::Max),
        a_f5::AMOMINU => amo_rw(c, AtomicOp::Minu),
        a_f5::AMOMAXU => amo_rw(c, AtomicOp::Maxu),
        _ => return false,
    };
    true
}

fn amo_rw(c: &mut ControlSignals, op: AtomicOp) -> AtomicOp {
    c.mem_read = true;
    c.mem_write = true;
    c.reg_write = true;
    op
}

fn build_system_control(c: &mut ControlSignals, d: &Decoded, f3: u32) -> bool {
    c.is_system = true;

    match d.raw {
        sys_op::ECALL | sys_op::EBREAK | sys_op::WFI => return true,
        sys_op::MRET => {
            c.is_mret = true;
            return true;
        }
        sys_op::SRET => {
            c.is_sret = true;
            return true;
        }
        _ => {}
    }

    if (d.raw & 0xFE007FFF) == sys_op::SFENCE_VMA {
        return true;
    }

    c.csr_op = match f3 {
        sys_op::CSRRW => CsrOp::Rw,
        sys_op::CSRRS => CsrOp::Rs,
        sys_op::CSRRC => CsrOp::Rc,
        sys_op::CSRRWI => CsrOp::Rwi,
        sys_op::CSRRSI => CsrOp::Rsi,
        sys_op::CSRRCI => CsrOp::Rci,
        _ => return false,
    };
    c.reg_write = true;
    c.csr_addr = InstructionBits::csr(&d.raw);
    true
}
