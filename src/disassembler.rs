//! # Classification Store
//!
//! Defines [`ByteType`], the closed set of per-byte classification tags, and [`Disassembler`], the
//! mutable state a single disassembly run is built around: the ROM buffer, the byte type map,
//! disassembly text, per-byte comments, label/port maps, cross-reference index, and vector
//! registries.
//!
//! Grounded on `rom_base.py`'s `RomBase` constructor and its `_set_data8_intel`/
//! `_set_data16_le_intel`/`_set_vector16_le_intel`/`add_xref`/`_lookup_a16_intel`/
//! `_lookup_port8_intel` methods, adapted to the teacher's preference for a single owned struct
//! over a class hierarchy.

use std::collections::BTreeMap;

use tracing::warn;

use crate::addr::Addr;
use crate::cpu::CpuKind;

/// The classification tag assigned to every byte of the ROM image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteType {
    /// Never visited by the traversal or a pre-classification hint.
    Unknown,
    /// First byte of a decoded instruction.
    Instruction,
    /// Continuation byte belonging to the preceding `Instruction`.
    Operand,
    /// A one-byte datum.
    Data8,
    /// Low byte of a little-endian 16-bit datum.
    Data16L,
    /// High byte of a little-endian 16-bit datum.
    Data16H,
    /// Low byte of a 16-bit code pointer.
    Vector16L,
    /// High byte of a 16-bit code pointer.
    Vector16H,
    /// An illegal or reserved opcode was encountered here.
    Error,
}

impl ByteType {
    fn name(&self) -> &'static str {
        match self {
            ByteType::Unknown => "Unknown",
            ByteType::Instruction => "Instruction",
            ByteType::Operand => "Operand",
            ByteType::Data8 => "Data8",
            ByteType::Data16L => "Data16L",
            ByteType::Data16H => "Data16H",
            ByteType::Vector16L => "Vector16L",
            ByteType::Vector16H => "Vector16H",
            ByteType::Error => "Error",
        }
    }
}

/// Owns every piece of mutable state for a single disassembly run.
///
/// Created once via [`Disassembler::new`], mutated by the traversal, the per-CPU decoders, and the
/// pre-classification hints, and finally read by the listing renderer. Not reused across runs.
pub struct Disassembler {
    pub(crate) rom: Vec<u8>,
    pub(crate) base_address: usize,
    pub(crate) max_address: usize,
    pub(crate) cpu: CpuKind,

    pub(crate) data_type: Vec<ByteType>,
    pub(crate) disassembly: Vec<String>,
    pub(crate) comments: Vec<String>,

    pub(crate) label_map: BTreeMap<usize, String>,
    pub(crate) port_map: BTreeMap<usize, String>,
    pub(crate) special_labels: BTreeMap<usize, String>,
    pub(crate) special_ports: BTreeMap<usize, String>,

    pub(crate) xref: BTreeMap<usize, Vec<usize>>,
    pub(crate) vector_addrs: Vec<usize>,
    pub(crate) vector_dests: Vec<usize>,
}

impl Disassembler {
    /// Builds a fresh classification store over `rom`, loaded at `base_address`.
    ///
    /// `special_labels`/`special_ports` are seeded from `cpu`'s defaults; callers wanting
    /// auto-labelling off a CPU's defaults (`--auto_label`) pass `cpu.default_labels()`/
    /// `cpu.default_ports()` again as the starting `label_map`/`port_map`.
    #[must_use]
    pub fn new(
        rom: Vec<u8>,
        base_address: usize,
        cpu: CpuKind,
        label_map: BTreeMap<usize, String>,
        port_map: BTreeMap<usize, String>,
    ) -> Self {
        let len = rom.len();
        let max_address = base_address + len.saturating_sub(1);
        Disassembler {
            rom,
            base_address,
            max_address,
            cpu,
            data_type: vec![ByteType::Unknown; len],
            disassembly: vec![String::new(); len],
            comments: vec![String::new(); len],
            label_map,
            port_map,
            special_labels: cpu.default_labels(),
            special_ports: cpu.default_ports(),
            xref: BTreeMap::new(),
            vector_addrs: Vec::new(),
            vector_dests: Vec::new(),
        }
    }

    /// Number of bytes in the ROM image.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rom.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rom.is_empty()
    }

    pub(crate) fn in_range(&self, address: usize) -> bool {
        address >= self.base_address && address <= self.max_address
    }

    pub(crate) fn idx(&self, address: usize) -> usize {
        address - self.base_address
    }

    pub(crate) fn byte_at(&self, address: usize) -> u8 {
        self.rom[self.idx(address)]
    }

    /// Reads the byte at `address`, or `0` if it falls outside the ROM (an instruction whose
    /// operand bytes run off the end of the image).
    pub(crate) fn byte_or_zero(&self, address: usize) -> u8 {
        if self.in_range(address) {
            self.byte_at(address)
        } else {
            0
        }
    }

    /// Tags `address` as [`ByteType::Operand`], if within the ROM.
    pub(crate) fn tag_operand(&mut self, address: usize) {
        if self.in_range(address) {
            let idx = self.idx(address);
            self.data_type[idx] = ByteType::Operand;
        }
    }

    pub(crate) fn append_comment(&mut self, idx: usize, text: &str) {
        if self.comments[idx].is_empty() {
            self.comments[idx] = text.to_string();
        } else {
            self.comments[idx].push(' ');
            self.comments[idx].push_str(text);
        }
    }

    fn conflict_warning(&mut self, idx: usize, address: usize, new: ByteType, access_addr: Option<Addr>) {
        let prior = self.data_type[idx];
        let msg = match access_addr {
            Some(a) => format!(
                "WARNING: {:04X}h retagged {} -> {} from {a}",
                address,
                prior.name(),
                new.name()
            ),
            None => format!(
                "WARNING: {:04X}h retagged {} -> {}",
                address,
                prior.name(),
                new.name()
            ),
        };
        warn!(address, prior = prior.name(), new = new.name(), "classification conflict");
        self.append_comment(idx, &msg);
    }

    /// Tags `address` as [`ByteType::Data8`].
    ///
    /// Bytes outside `[base_address, max_address]` are silently ignored. If the existing tag is
    /// neither `Unknown` nor `Data8`, a `WARNING` comment is appended naming the transition.
    pub fn set_data8(&mut self, address: usize, access_addr: Option<Addr>) {
        if !self.in_range(address) {
            return;
        }
        let idx = self.idx(address);
        let prior = self.data_type[idx];
        if prior != ByteType::Unknown && prior != ByteType::Data8 {
            self.conflict_warning(idx, address, ByteType::Data8, access_addr);
        }
        self.data_type[idx] = ByteType::Data8;
    }

    /// Tags `address` as [`ByteType::Data16L`] and `address + 1` as [`ByteType::Data16H`].
    ///
    /// Conflict warnings are appended unconditionally per byte on retag, independent of whether
    /// the other byte of the pair also conflicted.
    pub fn set_data16(&mut self, address: usize, access_addr: Option<Addr>) {
        self.set_data16_half(address, ByteType::Data16L, access_addr);
        self.set_data16_half(address + 1, ByteType::Data16H, access_addr);
    }

    fn set_data16_half(&mut self, address: usize, tag: ByteType, access_addr: Option<Addr>) {
        if !self.in_range(address) {
            return;
        }
        let idx = self.idx(address);
        let prior = self.data_type[idx];
        if prior != ByteType::Unknown && prior != tag {
            self.conflict_warning(idx, address, tag, access_addr);
        }
        self.data_type[idx] = tag;
    }

    /// Tags the two-byte location at `address` as a code vector, records it in the vector
    /// registries, and returns the little-endian 16-bit pointer value it holds.
    ///
    /// If either half falls outside the ROM, that half is skipped and the corresponding byte of
    /// the returned value is `0`.
    pub fn set_vector(&mut self, address: usize, access_addr: Option<Addr>) -> usize {
        let lo = if self.in_range(address) {
            let idx = self.idx(address);
            let prior = self.data_type[idx];
            if prior != ByteType::Unknown && prior != ByteType::Vector16L {
                self.conflict_warning(idx, address, ByteType::Vector16L, access_addr);
            }
            self.data_type[idx] = ByteType::Vector16L;
            self.byte_at(address) as usize
        } else {
            0
        };
        let hi = if self.in_range(address + 1) {
            let idx = self.idx(address + 1);
            let prior = self.data_type[idx];
            if prior != ByteType::Unknown && prior != ByteType::Vector16H {
                self.conflict_warning(idx, address + 1, ByteType::Vector16H, access_addr);
            }
            self.data_type[idx] = ByteType::Vector16H;
            self.byte_at(address + 1) as usize
        } else {
            0
        };
        let value = lo | (hi << 8);
        if !self.vector_addrs.contains(&address) {
            self.vector_addrs.push(address);
        }
        if !self.vector_dests.contains(&value) {
            self.vector_dests.push(value);
        }
        value
    }

    /// Records a static transfer of control from `source` to `dest`, deduplicated per destination.
    pub fn add_xref(&mut self, source: usize, dest: usize) {
        let sources = self.xref.entry(dest).or_default();
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    /// Resolves `address` to a symbolic name.
    ///
    /// If already present in `label_map`, returns the stored name. Otherwise, when `create` is
    /// true: the per-CPU `special_labels` name wins if present, else a fresh name is synthesised as
    /// `{prefix}{address:04X}`, inserted into `label_map`, and returned. When `create` is false and
    /// no label exists, the Intel hex literal is returned instead.
    pub fn lookup_address(&mut self, address: usize, create: bool, prefix: &str) -> String {
        if let Some(name) = self.label_map.get(&address) {
            return name.clone();
        }
        if !create {
            return crate::fmt::hex16_intel(address);
        }
        let name = self
            .special_labels
            .get(&address)
            .cloned()
            .unwrap_or_else(|| format!("{prefix}{address:04X}"));
        self.label_map.insert(address, name.clone());
        name
    }

    /// Resolves `port` to a symbolic name, analogous to [`Disassembler::lookup_address`] but over
    /// the port map with a 2-digit hex literal.
    pub fn lookup_port(&mut self, port: usize, create: bool, prefix: &str) -> String {
        if let Some(name) = self.port_map.get(&port) {
            return name.clone();
        }
        if !create {
            return crate::fmt::hex8_intel(port as u8);
        }
        let name = self
            .special_ports
            .get(&port)
            .cloned()
            .unwrap_or_else(|| format!("{prefix}{port:02X}"));
        self.port_map.insert(port, name.clone());
        name
    }

    pub(crate) fn set_text(&mut self, idx: usize, text: String) {
        self.disassembly[idx] = text;
    }

    pub(crate) fn set_error(&mut self, idx: usize, opcode: u8) {
        self.data_type[idx] = ByteType::Error;
        self.disassembly[idx] = format!("ERROR: invalid opcode {}", crate::fmt::hex8_intel(opcode));
        warn!(address = self.base_address + idx, opcode, "illegal opcode");
    }

    /// Decodes a single instruction at `address`, returning its successor addresses.
    ///
    /// Shared preamble ahead of the per-CPU opcode tables: bails out with no successors if
    /// `address` is already decoded, and logs plus overwrites if it was previously classified as
    /// something other than `Instruction`.
    pub(crate) fn disasm_single(&mut self, address: Addr, create_label: bool) -> Vec<Addr> {
        let idx = self.idx(address.usize());
        let prior = self.data_type[idx];
        if prior == ByteType::Instruction {
            return Vec::new();
        }
        if prior != ByteType::Unknown {
            self.conflict_warning(idx, address.usize(), ByteType::Instruction, None);
        }
        self.data_type[idx] = ByteType::Instruction;
        crate::decode::step(self, address, create_label)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fresh() -> Disassembler {
        Disassembler::new(vec![0u8; 16], 0, CpuKind::Intel8080, BTreeMap::new(), BTreeMap::new())
    }

    #[test]
    fn test_set_data8_idempotent() {
        let mut d = fresh();
        d.set_data8(4, None);
        d.set_data8(4, None);
        assert_eq!(d.data_type[4], ByteType::Data8);
        assert!(d.comments[4].is_empty());
    }

    #[test]
    fn test_set_data8_conflict_warns() {
        let mut d = fresh();
        d.data_type[4] = ByteType::Instruction;
        d.set_data8(4, None);
        assert_eq!(d.data_type[4], ByteType::Data8);
        assert!(d.comments[4].contains("WARNING"));
    }

    #[test]
    fn test_set_data8_out_of_range_ignored() {
        let mut d = fresh();
        d.set_data8(100, None);
    }

    #[test]
    fn test_set_data16_tags_both_halves() {
        let mut d = fresh();
        d.set_data16(4, None);
        assert_eq!(d.data_type[4], ByteType::Data16L);
        assert_eq!(d.data_type[5], ByteType::Data16H);
    }

    #[test]
    fn test_set_vector_reads_little_endian_value() {
        let mut d = fresh();
        d.rom[2] = 0x34;
        d.rom[3] = 0x12;
        let value = d.set_vector(2, None);
        assert_eq!(value, 0x1234);
        assert_eq!(d.data_type[2], ByteType::Vector16L);
        assert_eq!(d.data_type[3], ByteType::Vector16H);
        assert_eq!(d.vector_addrs, vec![2]);
        assert_eq!(d.vector_dests, vec![0x1234]);
    }

    #[test]
    fn test_set_vector_deduplicates() {
        let mut d = fresh();
        d.rom[2] = 0x00;
        d.rom[3] = 0x00;
        d.set_vector(2, None);
        d.set_vector(2, None);
        assert_eq!(d.vector_addrs, vec![2]);
        assert_eq!(d.vector_dests, vec![0]);
    }

    #[test]
    fn test_add_xref_deduplicates() {
        let mut d = fresh();
        d.add_xref(10, 20);
        d.add_xref(10, 20);
        d.add_xref(11, 20);
        assert_eq!(d.xref.get(&20).unwrap(), &vec![10, 11]);
    }

    #[test]
    fn test_lookup_address_first_write_wins() {
        let mut d = fresh();
        let a = d.lookup_address(8, true, "J_");
        let b = d.lookup_address(8, true, "C_");
        assert_eq!(a, "J_0008");
        assert_eq!(b, "J_0008");
    }

    #[test]
    fn test_lookup_address_special_label_wins() {
        let mut d = fresh();
        let name = d.lookup_address(0, true, "J_");
        assert_eq!(name, "RST0");
    }

    #[test]
    fn test_lookup_address_no_create_returns_hex() {
        let mut d = fresh();
        let name = d.lookup_address(5, false, "J_");
        assert_eq!(name, "0005h");
    }

    #[test]
    fn test_lookup_port_prefix() {
        let mut d = fresh();
        let name = d.lookup_port(0x07, true, "P_");
        assert_eq!(name, "P_07");
    }
}
