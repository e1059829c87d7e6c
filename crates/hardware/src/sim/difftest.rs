//! DiffTest: cross-checks the out-of-order engine against an independent
//! in-order reference core after every commit.
//!
//! The reference core is a full [`Simulator`] running the in-order backend,
//! loaded from the same ELF image into its own RAM so the two cores never
//! share mutable state. After each OoO commit at `committed_pc`, the harness
//! asserts the reference core's PC matches, steps it forward by exactly one
//! retired instruction, and compares all GPRs (`x0` skipped), all FPRs
//! (bit-exact), and a selected set of CSRs. A mismatch is fatal by default.

use crate::common::SimError;
use crate::core::Cpu;
use crate::sim::simulator::Simulator;

/// CSRs compared on every DiffTest check: mstatus, mtvec, mepc, mcause,
/// mtval, mip, mscratch, mhartid.
const KEY_CSR_ADDRS: [u32; 8] = [0x300, 0x305, 0x341, 0x342, 0x343, 0x344, 0x340, 0xF14];

/// Comparison counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffTestStats {
    /// Number of commits checked against the reference core.
    pub comparison_count: u64,
    /// Number of checks that found a divergence.
    pub mismatch_count: u64,
}

/// Differential-testing harness: an independent in-order reference core plus
/// the bookkeeping to step and compare it against the OoO core's commits.
pub struct DiffTest {
    reference: Simulator,
    enabled: bool,
    stop_on_mismatch: bool,
    comparison_count: u64,
    mismatch_count: u64,
}

impl DiffTest {
    /// Wraps an already-loaded reference [`Simulator`] (in-order backend,
    /// PC set to the program entry) as a DiffTest oracle.
    pub fn new(reference: Simulator) -> Self {
        Self {
            reference,
            enabled: true,
            stop_on_mismatch: true,
            comparison_count: 0,
            mismatch_count: 0,
        }
    }

    /// Enables or disables checking. Disabled, `step_and_compare` is a no-op.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether checking is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a mismatch aborts the process (default) or is only counted
    /// and logged.
    pub fn set_stop_on_mismatch(&mut self, stop: bool) {
        self.stop_on_mismatch = stop;
    }

    /// Current comparison/mismatch counters.
    pub fn stats(&self) -> DiffTestStats {
        DiffTestStats {
            comparison_count: self.comparison_count,
            mismatch_count: self.mismatch_count,
        }
    }

    /// Overrides the reference core's PC directly, bypassing the usual
    /// commit-PC assertion. Used once at startup.
    pub fn set_reference_pc(&mut self, pc: u64) {
        if !self.enabled {
            return;
        }
        self.reference.cpu.pc = pc;
    }

    /// Copies the OoO core's architectural GPR/FPR/selected-CSR state into
    /// the reference core. Used at initialization, and after any event where
    /// the OoO core's architectural state changed out-of-band (a syscall
    /// that mutates registers directly rather than through commit).
    pub fn sync_state(&mut self, ooo: &Cpu) {
        if !self.enabled {
            return;
        }
        for r in 0..32 {
            self.reference.cpu.regs.write(r, ooo.regs.read(r));
            self.reference.cpu.regs.write_f(r, ooo.regs.read_f(r));
        }
        for &addr in &KEY_CSR_ADDRS {
            self.reference.cpu.csr_write(addr, ooo.csr_read(addr));
        }
    }

    /// Called once per OoO commit, with the program counter of the
    /// instruction that just retired. Steps the reference core forward by
    /// exactly one retired instruction and compares architectural state.
    pub fn step_and_compare(&mut self, ooo: &Cpu, committed_pc: u64, cycle: u64) {
        if !self.enabled {
            return;
        }
        self.comparison_count += 1;

        if self.reference.cpu.pc != committed_pc {
            self.mismatch_count += 1;
            self.report(SimError::DiffTestMismatch {
                pc: committed_pc,
                cycle,
                diff: format!(
                    "pc mismatch before step: reference={:#x} ooo={:#x}",
                    self.reference.cpu.pc, committed_pc
                ),
            });
            return;
        }

        // A faulting instruction never bumps `instructions_retired` — it
        // redirects to the trap vector instead — so a trap on either core
        // must also end the wait, or a synchronous exception would spin
        // this loop forever.
        let retired_before = self.reference.cpu.stats.instructions_retired;
        let traps_before = self.reference.cpu.stats.traps_taken;
        loop {
            if let Err(e) = self.reference.tick() {
                self.mismatch_count += 1;
                self.report(SimError::DiffTestMismatch {
                    pc: committed_pc,
                    cycle,
                    diff: format!("reference core faulted while stepping: {e}"),
                });
                return;
            }
            if self.reference.cpu.stats.instructions_retired > retired_before
                || self.reference.cpu.stats.traps_taken > traps_before
                || self.reference.cpu.exit_code.is_some()
            {
                break;
            }
        }

        if let Some(diff) = self.compare(ooo) {
            self.mismatch_count += 1;
            self.report(SimError::DiffTestMismatch {
                pc: committed_pc,
                cycle,
                diff,
            });
        }
    }

    fn compare(&self, ooo: &Cpu) -> Option<String> {
        let mut diffs = Vec::new();
        for r in 1..32 {
            let (ooo_val, ref_val) = (ooo.regs.read(r), self.reference.cpu.regs.read(r));
            if ooo_val != ref_val {
                diffs.push(format!("x{r}: ooo={ooo_val:#x} ref={ref_val:#x}"));
            }
        }
        for r in 0..32 {
            let (ooo_val, ref_val) = (ooo.regs.read_f(r), self.reference.cpu.regs.read_f(r));
            if ooo_val != ref_val {
                diffs.push(format!("f{r}: ooo={ooo_val:#x} ref={ref_val:#x}"));
            }
        }
        for &addr in &KEY_CSR_ADDRS {
            let (ooo_val, ref_val) = (ooo.csr_read(addr), self.reference.cpu.csr_read(addr));
            if ooo_val != ref_val {
                diffs.push(format!("csr[{addr:#x}]: ooo={ooo_val:#x} ref={ref_val:#x}"));
            }
        }
        (!diffs.is_empty()).then(|| diffs.join(", "))
    }

    fn report(&self, err: SimError) {
        tracing::error!("{err}");
        if self.stop_on_mismatch {
            eprintln!("[!] {err}");
            std::process::exit(1);
        }
    }
}
