//! `sim6809` - run 6809 program images on a configured machine.
//!
//! ```text
//! sim6809 monitor.s19
//! sim6809 --origin C000 --until C010 -v rom.bin
//! RUST_LOG=trace sim6809 --steps 100 test.hex
//! ```
//!
//! The machine comes from `--config`, `$HOME/.sim6809.ini` or
//! `./.sim6809.ini`, in that order. ACIAs talk to the terminal.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lib6809::devices::StdioSerial;
use lib6809::{loader, BusErrorPolicy, Machine, MachineConfig, RunOutcome, SerialPort};

#[derive(Parser, Debug)]
#[command(name = "sim6809", version, about = "Motorola 6809 machine emulator")]
struct Args {
    /// Program images: .s19/.srec, .hex, or .bin raw binaries
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Load address of raw images in hex (default: end at $FFFF)
    #[arg(long, value_parser = parse_hex)]
    origin: Option<u16>,

    /// Machine description file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start address in hex, overriding the reset vector and image start
    #[arg(long, value_parser = parse_hex)]
    pc: Option<u16>,

    /// Stop when PC reaches this hex address
    #[arg(long, value_parser = parse_hex)]
    until: Option<u16>,

    /// Stop after this many steps
    #[arg(long)]
    steps: Option<u64>,

    /// Stop after this many cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// Log bus errors and keep running instead of halting
    #[arg(long)]
    keep_going: bool,

    /// Let newer devices shadow older ones where windows overlap
    #[arg(long)]
    allow_overlap: bool,

    /// Print registers and device status when the run ends
    #[arg(short, long)]
    dump: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Per-instruction trace logging
    #[arg(long)]
    trace: bool,
}

fn parse_hex(text: &str) -> Result<u16, String> {
    let digits = text
        .strip_prefix('$')
        .or_else(|| text.strip_prefix("0x"))
        .unwrap_or(text);
    u16::from_str_radix(digits, 16).map_err(|e| format!("'{}': {}", text, e))
}

fn init_logging(args: &Args) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if args.trace {
        builder.filter_level(log::LevelFilter::Trace);
    } else if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn build_machine(args: &Args) -> Result<Machine, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => MachineConfig::load(path)?,
        None => MachineConfig::discover()?,
    };
    config.allow_overlap |= args.allow_overlap;

    let mut bus = config.build_with_serial(|| Box::new(StdioSerial::new()) as Box<dyn SerialPort>)?;

    let mut start = None;
    for file in &args.files {
        let summary = loader::load_file(&mut bus, file, args.origin)?;
        log::info!(
            "{}: {} bytes at 0x{:04X}-0x{:04X}",
            file.display(),
            summary.bytes,
            summary.low,
            summary.high
        );
        start = summary.start.or(start);
    }

    let policy = if args.keep_going {
        BusErrorPolicy::Continue
    } else {
        BusErrorPolicy::Halt
    };
    let mut machine = Machine::new(bus).with_bus_error_policy(policy);
    if let Some(pc) = args.pc.or(start) {
        machine.cpu_mut().set_pc(pc);
    }
    Ok(machine)
}

fn dump(machine: &Machine) {
    eprintln!("{}", machine.cpu().registers());
    eprintln!("cycles: {}", machine.cycles());
    for line in machine.device_status() {
        eprintln!("{}", line);
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    let mut machine = match build_machine(&args) {
        Ok(machine) => machine,
        Err(err) => {
            eprintln!("sim6809: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = if let Some(addr) = args.until {
        machine.run_until(addr)
    } else if let Some(steps) = args.steps {
        machine.run_steps(steps)
    } else if let Some(cycles) = args.cycles {
        machine.run_cycles(cycles)
    } else {
        machine.run()
    };

    let code = match result {
        Ok(RunOutcome::Terminated) => ExitCode::SUCCESS,
        Ok(outcome) => {
            log::info!("run ended: {:?}", outcome);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("sim6809: {} (code {})", err, err.code());
            ExitCode::FAILURE
        }
    };

    if args.dump {
        dump(&machine);
    }
    code
}
