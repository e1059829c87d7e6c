//! Out-of-order backend: register renaming, per-class reservation stations
//! with CDB wakeup, and an out-of-order issue stage in front of the same
//! execute/memory/writeback/commit pipeline the in-order backend uses.
//!
//! Commit, writeback, and the memory stages are unchanged from the
//! in-order backend ([`shared`](super::shared)) — retirement is always
//! single-width and in program order regardless of issue order, so nothing
//! about those stages is specific to out-of-order execution. What changes
//! is everything upstream of execute: [`rat::RegisterAliasTable`] replaces
//! the same-cycle scoreboard lookup with persistent renaming, and
//! [`issue::O3IssueUnit`] replaces the FIFO issue queue with four
//! [`reservation_station::ReservationStationBank`]s woken by the common
//! data bus broadcast in [`O3Engine::tick`].

pub mod issue;
pub mod rat;
pub mod reservation_station;

use crate::config::Config;
use crate::core::Cpu;
use crate::core::pipeline::backend::inorder::execute;
use crate::core::pipeline::backend::shared::{commit, memory1, memory2, writeback};
use crate::core::pipeline::engine::ExecutionEngine;
use crate::core::pipeline::latches::{ExMem1Entry, Mem1Mem2Entry, Mem2WbEntry, RenameIssueEntry};
use crate::core::pipeline::rob::{Rob, RobState};
use crate::core::pipeline::scoreboard::Scoreboard;
use crate::core::pipeline::store_buffer::StoreBuffer;
use crate::sim::difftest::DiffTest;

use self::issue::O3IssueUnit;
use self::rat::RegisterAliasTable;

/// Out-of-order execution engine.
pub struct O3Engine {
    /// Reorder buffer — also the renamed-retirement ROB (a `PhysReg` in
    /// [`rat`] is simply the tag of the ROB entry that owns it).
    pub rob: Rob,
    /// Store buffer.
    pub store_buffer: StoreBuffer,
    /// Register alias table (the engine's producer map — see its own
    /// documentation for why it's a thin wrapper, not a second map).
    pub rat: RegisterAliasTable,
    /// Reservation stations + out-of-order issue.
    pub issuer: O3IssueUnit,
    /// Pipeline width.
    pub width: usize,
    /// Rename output that couldn't be dispatched into a reservation
    /// station this cycle (class bank full) — retried next cycle.
    pub pending_dispatch: Vec<RenameIssueEntry>,
    /// Execute -> Memory1 latch.
    pub execute_mem1: Vec<ExMem1Entry>,
    /// Memory1 -> Memory2 latch.
    pub mem1_mem2: Vec<Mem1Mem2Entry>,
    /// Memory2 -> Writeback latch.
    pub mem2_wb: Vec<Mem2WbEntry>,
    /// Memory1 stall counter (D-TLB / D-cache latency).
    pub mem1_stall: u64,
    /// Differential-testing oracle, attached by the host once the image is
    /// loaded. `None` runs the engine with no cross-checking at all.
    pub difftest: Option<DiffTest>,
}

impl O3Engine {
    /// Creates a new out-of-order engine from config.
    pub fn new(config: &Config) -> Self {
        let backend = &config.pipeline.backend;
        Self {
            rob: Rob::new(backend.rob_capacity),
            store_buffer: StoreBuffer::new(backend.store_buffer_capacity),
            rat: RegisterAliasTable::new(),
            issuer: O3IssueUnit::new(backend.rs_capacity),
            width: config.pipeline.width,
            pending_dispatch: Vec::new(),
            execute_mem1: Vec::with_capacity(config.pipeline.width),
            mem1_mem2: Vec::with_capacity(config.pipeline.width),
            mem2_wb: Vec::with_capacity(config.pipeline.width),
            mem1_stall: 0,
            difftest: None,
        }
    }
}

impl ExecutionEngine for O3Engine {
    fn tick(&mut self, cpu: &mut Cpu, rename_output: &mut Vec<RenameIssueEntry>) {
        // Commit: retire from ROB head, in program order, single-width.
        // difftest is stepped for every normal retirement inside commit_stage
        // itself; the trap path below steps it separately, once cpu.trap has
        // applied mepc/mcause/mtval so the reference core has something
        // meaningful to compare against.
        let trap_event = commit::commit_stage(
            cpu,
            &mut self.rob,
            &mut self.store_buffer,
            &mut self.rat,
            self.width,
            self.difftest.as_mut(),
        );

        if let Some((trap, pc)) = trap_event {
            if cpu.trace {
                eprintln!("BE  * HANDLING TRAP: {:?} at PC {:#x}", trap, pc);
            }
            self.flush(cpu);
            cpu.trap(trap, pc);
            if let Some(dt) = self.difftest.as_mut() {
                dt.step_and_compare(cpu, pc, cpu.stats.cycles);
            }
            return;
        }

        // Writeback marks ROB entries Completed; the common data bus then
        // broadcasts those results to every reservation station waiting on
        // them. Snapshot the tags before writeback drains mem2_wb.
        let completed_tags: Vec<_> = self.mem2_wb.iter().map(|e| e.rob_tag).collect();
        writeback::writeback_stage(cpu, &mut self.mem2_wb, &mut self.rob);
        for tag in completed_tags {
            if let Some(entry) = self.rob.find_entry(tag)
                && entry.state == RobState::Completed
            {
                self.issuer.wakeup(tag, entry.result);
            }
        }

        // Memory2: D-cache access / store buffer resolution.
        memory2::memory2_stage(
            cpu,
            &mut self.mem1_mem2,
            &mut self.mem2_wb,
            &mut self.store_buffer,
            &mut self.rob,
        );

        // Memory1: address translation (gated by mem1_stall).
        if self.mem1_stall > 0 {
            self.mem1_stall -= 1;
        } else {
            memory1::memory1_stage(
                cpu,
                &mut self.execute_mem1,
                &mut self.mem1_mem2,
                &mut self.mem1_stall,
            );
        }

        let backpressured = !self.execute_mem1.is_empty();

        // Issue + Execute: pull up to `width` ready instructions across all
        // reservation-station banks, then execute them through the same
        // ALU/FPU/BRU dispatch the in-order backend uses.
        let (results, needs_flush) = if backpressured {
            (Vec::new(), false)
        } else {
            let issued = self.issuer.select(self.width);
            execute::execute_inorder(cpu, issued, &mut self.rob)
        };
        self.execute_mem1.extend(results);

        if needs_flush {
            self.issuer.flush();
            self.pending_dispatch.clear();
            rename_output.clear();
            self.mem1_stall = 0;
            if let Some(last) = self.execute_mem1.last() {
                let keep_tag = last.rob_tag;
                self.rob.flush_after(keep_tag);
                self.store_buffer.flush_after(keep_tag);
            }
            self.rat.rebuild_from_rob(&self.rob);
        }

        // Dispatch: move rename output (plus anything retried from last
        // cycle) into the matching reservation-station bank.
        if !needs_flush && !backpressured {
            let mut to_dispatch = std::mem::take(&mut self.pending_dispatch);
            to_dispatch.append(&mut std::mem::take(rename_output));
            if !to_dispatch.is_empty() {
                self.issuer
                    .dispatch(to_dispatch, &mut self.pending_dispatch, cpu);
            }
        }
    }

    fn can_accept(&self) -> usize {
        let rob_free = self.rob.free_slots();
        let sb_free = self.store_buffer.free_slots();
        let issue_free = self.issuer.available_slots();
        rob_free.min(sb_free).min(issue_free).min(self.width)
    }

    fn flush(&mut self, _cpu: &mut Cpu) {
        self.rob.flush_all();
        self.store_buffer.flush_speculative();
        self.rat.flush();
        self.issuer.flush();
        self.pending_dispatch.clear();
        self.execute_mem1.clear();
        self.mem1_mem2.clear();
        self.mem2_wb.clear();
        self.mem1_stall = 0;
    }

    fn read_csr_speculative(&self, cpu: &Cpu, addr: u32) -> u64 {
        cpu.csr_read(addr)
    }

    fn rob(&self) -> &Rob {
        &self.rob
    }

    fn rob_mut(&mut self) -> &mut Rob {
        &mut self.rob
    }

    fn store_buffer(&self) -> &StoreBuffer {
        &self.store_buffer
    }

    fn store_buffer_mut(&mut self) -> &mut StoreBuffer {
        &mut self.store_buffer
    }

    fn scoreboard(&self) -> &Scoreboard {
        &self.rat
    }

    fn scoreboard_mut(&mut self) -> &mut Scoreboard {
        &mut self.rat
    }
}
