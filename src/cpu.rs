//! # CPU Registry
//!
//! Maps a CPU tag (as accepted on the command line) to its decoder, default entry points, default
//! labels, and default port map.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::addr::Addr;
use crate::errors::DisassemblerError;

/// The four instruction sets this disassembler understands.
///
/// The Intel 8085 is treated as a strict superset of the 8080: it shares the 8080 decoder and
/// default tables, and exists as its own variant only so `--cpu 8085` round-trips through
/// `--list_cpus`/error messages under its own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuKind {
    Intel8080,
    Intel8085,
    Z80,
    Cdp1802,
}

impl CpuKind {
    /// All CPU tags this disassembler supports, in the order `--list_cpus` should print them.
    pub const ALL: [CpuKind; 4] = [
        CpuKind::Intel8080,
        CpuKind::Intel8085,
        CpuKind::Z80,
        CpuKind::Cdp1802,
    ];

    /// The canonical CLI tag for this CPU.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            CpuKind::Intel8080 => "8080",
            CpuKind::Intel8085 => "8085",
            CpuKind::Z80 => "z80",
            CpuKind::Cdp1802 => "1802",
        }
    }

    /// Default traversal entry points for this CPU when none are given on the command line.
    #[must_use]
    pub fn default_entries(&self) -> Vec<Addr> {
        match self {
            CpuKind::Intel8080 | CpuKind::Intel8085 => {
                rst_vector_addresses().into_iter().map(Addr::from).collect()
            }
            CpuKind::Z80 => {
                let mut entries: Vec<Addr> =
                    rst_vector_addresses().into_iter().map(Addr::from).collect();
                entries.push(Addr::from(0x0066usize));
                entries
            }
            CpuKind::Cdp1802 => vec![Addr::from(0x0000usize)],
        }
    }

    /// Default label map for this CPU, used both as `special_labels` (canonical names for
    /// well-known addresses) and, when `--auto_label` is given without explicit `-l` flags, as
    /// the starting label map.
    #[must_use]
    pub fn default_labels(&self) -> BTreeMap<usize, String> {
        match self {
            CpuKind::Intel8080 | CpuKind::Intel8085 => rst_vector_addresses()
                .into_iter()
                .enumerate()
                .map(|(n, addr)| (addr, format!("RST{n}")))
                .collect(),
            CpuKind::Z80 => {
                let mut labels: BTreeMap<usize, String> = rst_vector_addresses()
                    .into_iter()
                    .map(|addr| (addr, format!("RST{addr:02X}")))
                    .collect();
                labels.insert(0x0066, "NMI".to_string());
                labels
            }
            CpuKind::Cdp1802 => {
                let mut labels = BTreeMap::new();
                labels.insert(0x0000, "RESET".to_string());
                labels
            }
        }
    }

    /// Default port map for this CPU. None of the four supported CPUs ship with any predefined
    /// port names.
    #[must_use]
    pub fn default_ports(&self) -> BTreeMap<usize, String> {
        BTreeMap::new()
    }
}

/// The eight `RST n` vector addresses shared by the 8080/8085/Z80 decoders.
fn rst_vector_addresses() -> Vec<usize> {
    (0..8).map(|n| n * 8).collect()
}

impl FromStr for CpuKind {
    type Err = DisassemblerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "8080" => CpuKind::Intel8080,
            "8085" => CpuKind::Intel8085,
            "z80" => CpuKind::Z80,
            "1802" => CpuKind::Cdp1802,
            _ => return Err(DisassemblerError::UnknownCpu(s.to_string())),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_str_accepts_known_tags() {
        assert_eq!(CpuKind::from_str("8080").unwrap(), CpuKind::Intel8080);
        assert_eq!(CpuKind::from_str("z80").unwrap(), CpuKind::Z80);
        assert_eq!(CpuKind::from_str("1802").unwrap(), CpuKind::Cdp1802);
    }

    #[test]
    fn test_from_str_rejects_unknown_tag() {
        assert!(CpuKind::from_str("6502").is_err());
    }

    #[test]
    fn test_8080_default_entries_are_rst_vectors() {
        let entries = CpuKind::Intel8080.default_entries();
        assert_eq!(entries.len(), 8);
        assert_eq!(entries[0].usize(), 0x00);
        assert_eq!(entries[7].usize(), 0x38);
    }

    #[test]
    fn test_z80_default_entries_include_nmi() {
        let entries = CpuKind::Z80.default_entries();
        assert_eq!(entries.len(), 9);
        assert_eq!(entries[8].usize(), 0x66);
    }

    #[test]
    fn test_1802_default_labels() {
        let labels = CpuKind::Cdp1802.default_labels();
        assert_eq!(labels.get(&0x0000).unwrap(), "RESET");
    }
}
