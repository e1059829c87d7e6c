//! Reservation stations: per-functional-class pools that hold dispatched
//! instructions until their operands arrive, then offer them to issue.
//!
//! Each entry is a [`RenameIssueEntry`] — the same structure the in-order
//! issue queue holds, with `rv1`/`rv2`/`rv3` still unresolved and
//! `rs1_tag`/`rs2_tag`/`rs3_tag` naming the producing ROB entries. Where the
//! in-order issue unit *pulls* operand values by checking the ROB each cycle
//! (`read_operand_by_tag`), a reservation station is *pushed* to: when an
//! instruction's result reaches writeback, [`ReservationStationBank::wakeup`]
//! broadcasts it (the common-data-bus pattern) to every waiting entry across
//! all banks, clearing the matching tag and filling the value. An entry is
//! ready to issue once none of its source tags remain.

use crate::core::pipeline::latches::RenameIssueEntry;
use crate::core::pipeline::rob::RobTag;

/// Which functional-unit class an instruction's reservation station entry
/// belongs to. Mirrors the functional split `compute_alu`/`execute_inorder`
/// already make internally via `ControlSignals`, but gives out-of-order
/// issue four independent pools instead of one FIFO so a stalled load
/// doesn't block an unrelated ready ALU op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RsClass {
    Alu,
    Branch,
    LoadStore,
    Fpu,
}

impl RsClass {
    /// Classifies a dispatched instruction by its control signals.
    pub fn of(entry: &RenameIssueEntry) -> Self {
        if entry.ctrl.mem_read || entry.ctrl.mem_write {
            Self::LoadStore
        } else if entry.ctrl.branch || entry.ctrl.jump {
            Self::Branch
        } else if entry.ctrl.fp_reg_write || entry.ctrl.rs1_fp || entry.ctrl.rs2_fp {
            Self::Fpu
        } else {
            Self::Alu
        }
    }
}

/// A fixed-capacity pool of in-flight, not-yet-issued instructions for one
/// functional class.
pub struct ReservationStationBank {
    slots: Vec<Option<RenameIssueEntry>>,
    capacity: usize,
}

impl ReservationStationBank {
    /// Creates an empty bank with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            capacity,
        }
    }

    /// Number of free slots.
    pub fn free_slots(&self) -> usize {
        self.capacity - self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Inserts an entry into the first free slot. Returns the entry back
    /// if the bank is full.
    pub fn insert(&mut self, entry: RenameIssueEntry) -> Option<RenameIssueEntry> {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.is_none()) {
            *slot = Some(entry);
            None
        } else {
            Some(entry)
        }
    }

    /// Broadcasts a completed result: any waiting entry whose source tag
    /// matches `tag` has that source resolved to `value`.
    pub fn wakeup(&mut self, tag: RobTag, value: u64) {
        for slot in self.slots.iter_mut().flatten() {
            if slot.rs1_tag == Some(tag) {
                slot.rv1 = value;
                slot.rs1_tag = None;
            }
            if slot.rs2_tag == Some(tag) {
                slot.rv2 = value;
                slot.rs2_tag = None;
            }
            if slot.ctrl.rs3_fp && slot.rs3_tag == Some(tag) {
                slot.rv3 = value;
                slot.rs3_tag = None;
            }
        }
    }

    /// Removes and returns every entry whose operands are all resolved,
    /// oldest (smallest ROB tag) first, so that selection order is
    /// deterministic regardless of slot layout.
    pub fn select_ready(&mut self, max: usize) -> Vec<RenameIssueEntry> {
        let mut ready_indices: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                let e = s.as_ref()?;
                let has_trap = e.trap.is_some();
                let resolved = has_trap
                    || (e.rs1_tag.is_none()
                        && e.rs2_tag.is_none()
                        && (!e.ctrl.rs3_fp || e.rs3_tag.is_none()));
                resolved.then_some(i)
            })
            .collect();

        ready_indices.sort_by_key(|&i| self.slots[i].as_ref().unwrap().rob_tag.0);
        ready_indices.truncate(max);

        ready_indices
            .into_iter()
            .map(|i| self.slots[i].take().unwrap())
            .collect()
    }

    /// Removes every entry whose ROB tag is strictly newer than `keep_tag`
    /// (branch misprediction / trap squash).
    pub fn flush_after(&mut self, keep_tag: RobTag) {
        for slot in &mut self.slots {
            if let Some(e) = slot
                && e.rob_tag.0 > keep_tag.0
            {
                *slot = None;
            }
        }
    }

    /// Removes every entry.
    pub fn flush_all(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}
