//! # Per-CPU Decoders
//!
//! Each supported instruction set gets one free function, `step`, over the shared
//! [`Disassembler`](crate::disassembler::Disassembler) state rather than a trait object — the set
//! of CPUs is closed and known at compile time, so a `match` on [`CpuKind`](crate::cpu::CpuKind)
//! does the dispatch the teacher would otherwise reach for a trait object to do.

mod cdp1802;
mod i8080;
mod z80;

use crate::addr::Addr;
use crate::cpu::CpuKind;
use crate::disassembler::Disassembler;

/// Decodes the instruction at `address`, having already been tagged `Instruction` by
/// [`Disassembler::disasm_single`](crate::disassembler::Disassembler::disasm_single), and returns
/// its successor addresses in traversal order.
pub(crate) fn step(d: &mut Disassembler, address: Addr, create_label: bool) -> Vec<Addr> {
    match d.cpu {
        CpuKind::Intel8080 | CpuKind::Intel8085 => i8080::step(d, address, create_label),
        CpuKind::Z80 => z80::step(d, address, create_label),
        CpuKind::Cdp1802 => cdp1802::step(d, address, create_label),
    }
}
