//! `romdis`: a command-line front end over the [`romdis`] disassembly engine.
//!
//! Parses the ROM image and CLI configuration, drives one disassembly run, and prints the
//! rendered listing to stdout.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use romdis::addr::Addr;
use romdis::cpu::CpuKind;
use romdis::disassembler::Disassembler;
use romdis::errors::{DisassemblerError, Result};

/// A retargetable static disassembler for legacy 8-bit microprocessor ROM images.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// List supported CPU tags and exit.
    #[arg(long = "list_cpus")]
    list_cpus: bool,

    /// Target CPU: one of `1802`, `8080`, `8085`, `z80`.
    #[arg(short = 'c', long)]
    cpu: Option<String>,

    /// Address the ROM image is loaded at.
    #[arg(short = 'B', long = "base_address", value_parser = parse_int, default_value = "0")]
    base_address: usize,

    /// Entry point address; may be repeated.
    #[arg(short = 'e', long = "entry", value_parser = parse_int)]
    entry: Vec<usize>,

    /// Address the traversal must not decode past; may be repeated.
    #[arg(short = 'b', long = "breakpoint", value_parser = parse_int)]
    breakpoint: Vec<usize>,

    /// Enable the CPU's default labels/ports and auto-creation of new labels.
    #[arg(short = 'a', long = "auto_label")]
    auto_label: bool,

    /// Add a memory label: `-l ADDRESS LABEL`. May be repeated.
    #[arg(short = 'l', long = "label", num_args = 2, value_names = ["ADDRESS", "LABEL"])]
    label: Vec<String>,

    /// Add a port label: `-p PORTNUM LABEL`. May be repeated.
    #[arg(short = 'p', long = "port", num_args = 2, value_names = ["PORTNUM", "LABEL"])]
    port: Vec<String>,

    /// Pre-classify an address as one-byte data; may be repeated.
    #[arg(short = 'd', long = "data8", value_parser = parse_int)]
    data8: Vec<usize>,

    /// Pre-classify an address as two-byte little-endian data; may be repeated.
    #[arg(short = 'w', long = "data16", value_parser = parse_int)]
    data16: Vec<usize>,

    /// Register an address as a code vector; may be repeated.
    #[arg(short = 'v', long = "vector", value_parser = parse_int)]
    vector: Vec<usize>,

    /// Emit source-mode output (no address/data columns).
    #[arg(short = 's', long)]
    source: bool,

    /// Raise log verbosity; may be repeated.
    #[arg(long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// ROM image to disassemble.
    file: Option<PathBuf>,
}

/// Parses an integer accepting decimal and `0x`/`0o`/`0b` prefixed bases, mirroring the original
/// CLI's auto-base integer argument.
fn parse_int(s: &str) -> std::result::Result<usize, String> {
    let (digits, radix) = if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (rest, 16)
    } else if let Some(rest) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        (rest, 8)
    } else if let Some(rest) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        (rest, 2)
    } else {
        (s, 10)
    };
    usize::from_str_radix(digits, radix).map_err(|e| e.to_string())
}

fn pairs(values: &[String]) -> Vec<(String, String)> {
    values.chunks_exact(2).map(|c| (c[0].clone(), c[1].clone())).collect()
}

fn main() -> Result<()> {
    human_panic::setup_panic!();
    let args = Args::parse();

    if args.list_cpus {
        for cpu in CpuKind::ALL {
            println!("{}", cpu.tag());
        }
        return Ok(());
    }

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let cpu_tag = args
        .cpu
        .as_deref()
        .ok_or_else(|| DisassemblerError::UnknownCpu("<none given>".to_string()))?;
    let cpu: CpuKind = cpu_tag.parse()?;

    let path = args.file.ok_or(DisassemblerError::MissingRomFile)?;
    let rom = std::fs::read(path)?;

    let mut label_map = if args.auto_label { cpu.default_labels() } else { BTreeMap::new() };
    for (address, name) in pairs(&args.label) {
        label_map.insert(parse_int(&address).map_err(|_| DisassemblerError::MissingLabelArgument("-l/--label"))?, name);
    }

    let mut port_map = if args.auto_label { cpu.default_ports() } else { BTreeMap::new() };
    for (port, name) in pairs(&args.port) {
        port_map.insert(parse_int(&port).map_err(|_| DisassemblerError::MissingPortArgument("-p/--port"))?, name);
    }

    let entries: Vec<Addr> = if args.entry.is_empty() {
        cpu.default_entries()
    } else {
        args.entry.iter().map(|&a| Addr::from(a)).collect()
    };
    let breakpoints: Vec<Addr> = args.breakpoint.iter().map(|&a| Addr::from(a)).collect();
    let vectors: Vec<Addr> = args.vector.iter().map(|&a| Addr::from(a)).collect();

    let mut disassembler = Disassembler::new(rom, args.base_address, cpu, label_map, port_map);

    for &address in &args.data8 {
        disassembler.set_data8(address, None);
    }
    for &address in &args.data16 {
        disassembler.set_data16(address, None);
    }

    disassembler.disassemble(&entries, args.auto_label, false, None, &breakpoints, &vectors)?;

    let listing = disassembler.listing(args.source)?;
    print!("{listing}");

    Ok(())
}
