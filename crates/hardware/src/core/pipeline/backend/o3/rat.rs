//! Register Alias Table: maps architectural registers to in-flight producers.
//!
//! Renaming in this engine is tag-based rather than backed by a separate
//! physical register file: a [`PhysReg`] *is* the [`RobTag`] of the producing
//! instruction, and the value lives in that ROB entry until it commits. The
//! free list is therefore implicit — a physical register frees the instant
//! its owning ROB entry retires, which the ROB already guarantees by
//! construction.
//!
//! The bookkeeping itself is the same tag-producer map `Scoreboard` already
//! implements for the in-order engine's same-cycle hazard checks, so
//! `RegisterAliasTable` wraps one rather than re-deriving it — `rename`/
//! `lookup`/`retire_if_match` are the RAT-shaped API the O3 rename and
//! reservation-station wakeup paths use, in terms of [`PhysReg`] instead of
//! bare [`RobTag`], while [`ExecutionEngine::scoreboard`] still sees through
//! to the same underlying map the frontend's rename stage already knows how
//! to drive.
//!
//! [`ExecutionEngine::scoreboard`]: crate::core::pipeline::engine::ExecutionEngine::scoreboard

use crate::core::pipeline::rob::{Rob, RobTag};
use crate::core::pipeline::scoreboard::Scoreboard;
use std::ops::{Deref, DerefMut};

/// A physical register name. Backed by the ROB tag of the producing
/// instruction — there is no separate physical register file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysReg(pub RobTag);

/// Register Alias Table: the architectural-to-physical mapping used by the
/// out-of-order backend's rename stage and reservation-station wakeup.
pub struct RegisterAliasTable(Scoreboard);

impl Default for RegisterAliasTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterAliasTable {
    /// Creates a RAT with every register mapped to the architectural file
    /// (no in-flight producers).
    pub fn new() -> Self {
        Self(Scoreboard::new())
    }

    /// Renames `reg` to the given physical register (the tag of the
    /// instruction that will produce its value). No-op for `x0`.
    pub fn rename(&mut self, reg: usize, is_fp: bool, phys: PhysReg) {
        self.0.set_producer(reg, is_fp, phys.0);
    }

    /// Looks up the current alias for a register, or `None` if it should be
    /// read from the architectural register file.
    pub fn lookup(&self, reg: usize, is_fp: bool) -> Option<PhysReg> {
        self.0.get_producer(reg, is_fp).map(PhysReg)
    }

    /// Retires an alias, but only if it still points at `phys` — an older
    /// commit must not clobber a newer rename of the same register (WAW).
    pub fn retire_if_match(&mut self, reg: usize, is_fp: bool, phys: PhysReg) {
        self.0.clear_if_match(reg, is_fp, phys.0);
    }

    /// Rebuilds the table from the surviving ROB entries after a partial
    /// flush (branch misprediction): the newest surviving writer of each
    /// register wins.
    pub fn rebuild_from_rob(&mut self, rob: &Rob) {
        self.0.rebuild_from_rob(rob);
    }
}

impl Deref for RegisterAliasTable {
    type Target = Scoreboard;
    fn deref(&self) -> &Scoreboard {
        &self.0
    }
}

impl DerefMut for RegisterAliasTable {
    fn deref_mut(&mut self) -> &mut Scoreboard {
        &mut self.0
    }
}
