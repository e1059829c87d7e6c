//! Out-of-order issue unit: four reservation-station banks plus a
//! deterministic, oldest-ready-first selection across them.
//!
//! Selection order is fixed (Alu, Branch, LoadStore, Fpu) and, within a
//! bank, oldest ROB tag first. Re-running the same program always produces
//! the same issue order for a given set of ready instructions, which keeps
//! the engine's commit stream — and so DiffTest — reproducible despite
//! issuing out of program order.

use crate::core::Cpu;
use crate::core::pipeline::latches::RenameIssueEntry;
use crate::core::pipeline::rob::RobTag;

use super::reservation_station::{ReservationStationBank, RsClass};

/// Out-of-order issue unit: one reservation-station bank per functional
/// class.
pub struct O3IssueUnit {
    alu: ReservationStationBank,
    branch: ReservationStationBank,
    load_store: ReservationStationBank,
    fpu: ReservationStationBank,
}

impl O3IssueUnit {
    /// Creates an issue unit with `capacity` reservation-station slots in
    /// each of the four per-class banks.
    pub fn new(capacity: usize) -> Self {
        Self {
            alu: ReservationStationBank::new(capacity),
            branch: ReservationStationBank::new(capacity),
            load_store: ReservationStationBank::new(capacity),
            fpu: ReservationStationBank::new(capacity),
        }
    }

    fn bank_mut(&mut self, class: RsClass) -> &mut ReservationStationBank {
        match class {
            RsClass::Alu => &mut self.alu,
            RsClass::Branch => &mut self.branch,
            RsClass::LoadStore => &mut self.load_store,
            RsClass::Fpu => &mut self.fpu,
        }
    }

    /// Dispatches rename output into the bank matching each instruction's
    /// class. An entry that finds its class bank full is pushed back onto
    /// `pending` for retry next cycle — this only happens when `can_accept`
    /// under-reported a class-specific bottleneck (see its doc comment).
    ///
    /// Sources whose rename-time tag was already `None` (no in-flight
    /// producer) are read from the architectural register file here rather
    /// than at issue, since nothing can write them before this instruction
    /// commits — only commit mutates the register file, and commit is
    /// strictly in program order. Sources with a tag are left for
    /// [`ReservationStationBank::wakeup`] to fill.
    pub fn dispatch(
        &mut self,
        entries: Vec<RenameIssueEntry>,
        pending: &mut Vec<RenameIssueEntry>,
        cpu: &Cpu,
    ) {
        for mut entry in entries {
            resolve_known_operands(&mut entry, cpu);
            let class = RsClass::of(&entry);
            if let Some(rejected) = self.bank_mut(class).insert(entry) {
                pending.push(rejected);
            }
        }
    }

    /// The smallest number of free slots across all four banks.
    ///
    /// This is a conservative (and simplified) admission bound: it doesn't
    /// know the class mix of the instructions about to be renamed, so it
    /// sizes every class's headroom off the tightest one rather than
    /// tracking per-class demand.
    pub fn available_slots(&self) -> usize {
        self.alu
            .free_slots()
            .min(self.branch.free_slots())
            .min(self.load_store.free_slots())
            .min(self.fpu.free_slots())
    }

    /// Broadcasts a completed result to every bank.
    pub fn wakeup(&mut self, tag: RobTag, value: u64) {
        self.alu.wakeup(tag, value);
        self.branch.wakeup(tag, value);
        self.load_store.wakeup(tag, value);
        self.fpu.wakeup(tag, value);
    }

    /// Selects up to `width` ready instructions this cycle, in class order
    /// (Alu, Branch, LoadStore, Fpu), oldest-first within each class.
    pub fn select(&mut self, width: usize) -> Vec<RenameIssueEntry> {
        let mut selected = Vec::with_capacity(width);
        for class in [RsClass::Alu, RsClass::Branch, RsClass::LoadStore, RsClass::Fpu] {
            if selected.len() >= width {
                break;
            }
            let remaining = width - selected.len();
            selected.extend(self.bank_mut(class).select_ready(remaining));
        }
        selected
    }

    /// Flushes reservation-station entries allocated after `keep_tag`.
    pub fn flush_after(&mut self, keep_tag: RobTag) {
        self.alu.flush_after(keep_tag);
        self.branch.flush_after(keep_tag);
        self.load_store.flush_after(keep_tag);
        self.fpu.flush_after(keep_tag);
    }

    /// Flushes every reservation station entirely.
    pub fn flush(&mut self) {
        self.alu.flush_all();
        self.branch.flush_all();
        self.load_store.flush_all();
        self.fpu.flush_all();
    }
}

/// Fills any source operand whose rename-time tag is already `None` from
/// the current architectural register file. `x0` always reads as zero.
fn resolve_known_operands(entry: &mut RenameIssueEntry, cpu: &Cpu) {
    if entry.rs1_tag.is_none() {
        entry.rv1 = read_reg(entry.rs1, entry.ctrl.rs1_fp, cpu);
    }
    if entry.rs2_tag.is_none() {
        entry.rv2 = read_reg(entry.rs2, entry.ctrl.rs2_fp, cpu);
    }
    if entry.ctrl.rs3_fp {
        if entry.rs3_tag.is_none() {
            entry.rv3 = read_reg(entry.rs3, true, cpu);
        }
    } else {
        entry.rv3 = 0;
    }
}

fn read_reg(reg: usize, is_fp: bool, cpu: &Cpu) -> u64 {
    if !is_fp && reg == 0 {
        0
    } else if is_fp {
        cpu.regs.read_f(reg)
    } else {
        cpu.regs.read(reg)
    }
}
