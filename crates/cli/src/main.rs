//! RISC-V out-of-order simulator CLI.
//!
//! Single entry point: load an ELF (or flat binary) image, run the
//! configured pipeline backend to completion or a syscall exit, and report
//! final architectural state and stats.

use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use rv_ooo_core::Simulator;
use rv_ooo_core::common::SimError;
use rv_ooo_core::config::Config;
use rv_ooo_core::core::pipeline::engine::BackendType;
use rv_ooo_core::sim::difftest::DiffTest;
use rv_ooo_core::sim::loader;
use rv_ooo_core::soc::System;

/// RISC-V cycle-level out-of-order simulator with DiffTest.
#[derive(Parser, Debug)]
#[command(
    name = "rv-ooo-sim",
    author,
    version,
    about = "Cycle-level RV64GC simulator with an in-order and an out-of-order backend",
    long_about = "Loads an ELF (or flat) binary and runs it to completion, cross-checking \
every committed instruction against a reference core (DiffTest).\n\n\
Examples:\n  \
rv-ooo-sim --elf build/qsort.elf\n  \
rv-ooo-sim --elf build/qsort.elf --ooo --debug\n  \
rv-ooo-sim --elf build/qsort.elf -m 0x4000000 --debug-flags=pipeline,memory"
)]
struct Args {
    /// ELF (or flat bare-metal) binary to execute.
    #[arg(short = 'e', long = "elf")]
    elf: String,

    /// RAM size override in bytes (accepts `0x` hex).
    #[arg(short = 'm', value_parser = parse_int)]
    ram_size: Option<u64>,

    /// Single-step: pause for Enter after every cycle.
    #[arg(short = 's', long = "step")]
    step: bool,

    /// Enable the per-instruction execution trace.
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Use the out-of-order backend (default: in-order).
    #[arg(long, conflicts_with = "in_order")]
    ooo: bool,

    /// Use the in-order backend (default).
    #[arg(long)]
    in_order: bool,

    /// Disable DiffTest cross-checking (out-of-order backend only).
    #[arg(long)]
    no_difftest: bool,

    /// Report DiffTest mismatches but keep running instead of aborting.
    #[arg(long)]
    difftest_continue: bool,

    /// Named bundle of debug categories (e.g. `pipeline`, `memory`, `difftest`).
    #[arg(long)]
    debug_preset: Option<String>,

    /// Comma-separated debug categories, forwarded into the tracing filter.
    #[arg(long, value_delimiter = ',')]
    debug_flags: Vec<String>,

    /// Restrict debug output to a cycle range, e.g. `1000-2000`.
    #[arg(long)]
    debug_cycles: Option<String>,

    /// Use the simple per-instruction trace format.
    #[arg(long, conflicts_with_all = ["debug_verbose", "debug_with_pc"])]
    debug_simple: bool,

    /// Use the verbose per-instruction trace format.
    #[arg(long)]
    debug_verbose: bool,

    /// Include the PC in every trace line.
    #[arg(long)]
    debug_with_pc: bool,

    /// Write debug output to this file instead of stderr.
    #[arg(long)]
    debug_file: Option<String>,

    /// Suppress the stderr debug writer (only meaningful with `--debug-file`).
    #[arg(long)]
    debug_no_console: bool,
}

/// Parses `0x`-prefixed hex or plain decimal integers for CLI flags.
fn parse_int(s: &str) -> Result<u64, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<u64>().map_err(|e| e.to_string())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    install_tracing(&args);

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("[!] {e}");
            ExitCode::FAILURE
        }
    }
}

/// Installs a `tracing-subscriber` filter built from `RUST_LOG` and
/// `--debug-flags`; `--debug` alone defaults the crate's own target to
/// `trace` so the per-instruction stage trace (gated on `cpu.trace`) has
/// somewhere to go even without `RUST_LOG` set.
fn install_tracing(args: &Args) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.debug { "rv_ooo_core=trace" } else { "warn" })
    });
    let preset_flags = debug_preset_flags(args.debug_preset.as_deref());
    for flag in args.debug_flags.iter().map(String::as_str).chain(preset_flags.iter().copied()) {
        if let Ok(directive) = format!("rv_ooo_core::{flag}=trace").parse() {
            filter = filter.add_directive(directive);
        }
    }

    // `--debug-file` redirects structured output to a file; `--debug-no-console`
    // only has an effect alongside it (tracing-subscriber's default builder
    // takes a single writer, so file-and-console simultaneously would need a
    // layered subscriber, which isn't needed yet).
    match &args.debug_file {
        Some(path) if args.debug_no_console => match std::fs::File::create(path) {
            Ok(file) => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .init(),
            Err(e) => {
                eprintln!("[!] could not create --debug-file {path}: {e}");
                std::process::exit(1);
            }
        },
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Expands `--debug-preset=<name>` into its bundle of debug categories.
fn debug_preset_flags(preset: Option<&str>) -> &'static [&'static str] {
    match preset {
        Some("pipeline") => &["core::pipeline"],
        Some("memory") => &["core::units::mmu", "core::units::cache", "soc::memory"],
        Some("difftest") => &["sim::difftest"],
        _ => &[],
    }
}

/// Builds the config, loads the image, and runs the simulator to exit.
fn run(args: &Args) -> Result<u8, SimError> {
    let mut config = Config::default();
    config.general.trace_instructions = args.debug;
    if let Some(ram_size) = args.ram_size {
        config.memory.ram_size = ram_size as usize;
    }
    config.pipeline.backend.backend_type = if args.ooo {
        BackendType::OutOfOrder
    } else {
        BackendType::InOrder
    };

    let system = System::new(&config, "");
    let mut sim = Simulator::new(system, &config);

    let entry = load_image(&mut sim.cpu, &config, &args.elf)?;
    sim.cpu.pc = entry;

    tracing::info!(elf = %args.elf, entry = %format!("{entry:#x}"), backend = ?config.pipeline.backend.backend_type, "loaded image");

    if args.ooo && !args.no_difftest {
        let mut ref_config = config.clone();
        ref_config.pipeline.backend.backend_type = BackendType::InOrder;
        let ref_system = System::new(&ref_config, "");
        let mut reference = Simulator::new(ref_system, &ref_config);
        let ref_entry = load_image(&mut reference.cpu, &ref_config, &args.elf)?;
        reference.cpu.pc = ref_entry;

        let mut difftest = DiffTest::new(reference);
        difftest.set_stop_on_mismatch(!args.difftest_continue);
        difftest.sync_state(&sim.cpu);
        difftest.set_reference_pc(entry);
        sim.pipeline.attach_difftest(difftest);
    }

    loop {
        if let Err(e) = sim.tick() {
            eprintln!("\n[!] FATAL TRAP: {e}");
            sim.cpu.dump_state();
            sim.cpu.stats.print();
            return Ok(1);
        }
        if let Some(code) = sim.take_exit() {
            println!("\n[*] Exit code {code}");
            sim.cpu.stats.print();
            if let Some(stats) = sim.pipeline.difftest_stats() {
                println!(
                    "[*] DiffTest: {} comparisons, {} mismatches",
                    stats.comparison_count, stats.mismatch_count
                );
            }
            std::io::stdout().flush().ok();
            return Ok(code as u8);
        }
        if args.step {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).ok();
        }
    }
}

/// Loads `path` as an ELF or flat binary into `cpu`'s memory and returns the
/// entry point.
fn load_image(cpu: &mut rv_ooo_core::Cpu, config: &Config, path: &str) -> Result<u64, SimError> {
    if path.ends_with(".elf") || looks_like_elf(path) {
        loader::load_elf(cpu, path)
    } else {
        let data = loader::load_binary(path);
        let load_addr = config.system.ram_base;
        cpu.bus.load_binary_at(&data, load_addr);
        Ok(load_addr)
    }
}

/// Sniffs the ELF magic bytes so callers don't need a `.elf` extension.
fn looks_like_elf(path: &str) -> bool {
    std::fs::read(path)
        .map(|data| data.starts_with(&[0x7f, b'E', b'L', b'F']))
        .unwrap_or(false)
}
