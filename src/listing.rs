//! # Listing Renderer
//!
//! Turns a finished classification store into an assembly listing, in listing (default, four
//! column) or source (label-first) mode. Built with `write!`/`writeln!` into an owned `String`
//! buffer, in the manner of the teacher's own `Display` implementation for its disassembly type —
//! exposed as a method rather than `Display` since it takes the mode switch as a parameter.
//!
//! Grounded on `rom_base.py`'s `_listing_a16_d8_intel`.

use std::fmt::Write as _;

use crate::disassembler::{ByteType, Disassembler};
use crate::errors::Result;
use crate::fmt::{hex16_intel, hex8_intel};

#[derive(PartialEq, Eq, Clone, Copy)]
enum Category {
    Unknown,
    DataOrVector,
    Code,
}

fn category(tag: ByteType) -> Category {
    match tag {
        ByteType::Unknown => Category::Unknown,
        ByteType::Data8
        | ByteType::Data16L
        | ByteType::Data16H
        | ByteType::Vector16L
        | ByteType::Vector16H
        | ByteType::Error => Category::DataOrVector,
        ByteType::Instruction | ByteType::Operand => Category::Code,
    }
}

impl Disassembler {
    /// Renders the finished classification store to an assembly listing.
    ///
    /// `source` selects source mode (label-first, no address/data columns) over the default
    /// listing mode (four columns including address and raw bytes).
    pub fn listing(&mut self, source: bool) -> Result<String> {
        let mut buf = String::new();

        self.render_external_references(&mut buf, source)?;
        self.render_port_map(&mut buf, source)?;
        self.render_disassembly(&mut buf, source)?;
        if !source {
            self.render_xref_list(&mut buf)?;
        }

        writeln!(buf, "END")?;
        Ok(buf)
    }

    fn section_header(&self, buf: &mut String, source: bool, title: &str) -> Result<()> {
        writeln!(buf)?;
        if !source {
            write!(buf, "{:24}", "")?;
        }
        writeln!(buf, "{title}")?;
        Ok(())
    }

    fn render_external_references(&self, buf: &mut String, source: bool) -> Result<()> {
        self.section_header(buf, source, "External References")?;
        for (&address, name) in &self.label_map {
            if address < self.base_address || address > self.max_address {
                writeln!(buf, "{name:<16} EQU  {}", hex16_intel(address))?;
            }
        }
        Ok(())
    }

    fn render_port_map(&self, buf: &mut String, source: bool) -> Result<()> {
        self.section_header(buf, source, "IO Port Map")?;
        for (&port, name) in &self.port_map {
            writeln!(buf, "{name:<16} EQU  {}", hex8_intel(port as u8))?;
        }
        Ok(())
    }

    fn render_disassembly(&mut self, buf: &mut String, source: bool) -> Result<()> {
        self.section_header(buf, source, "ROM Disassembly")?;
        self.write_line(buf, source, None, None, &format!("ORG {}", hex16_intel(self.base_address)), "")?;

        let mut i = 0;
        let mut prev_category: Option<Category> = None;
        let len = self.data_type.len();
        while i < len {
            let address = self.base_address + i;
            let tag = self.data_type[i];
            let cat = category(tag);

            let needs_blank = prev_category.is_some()
                && (self.xref.contains_key(&address)
                    || self.vector_dests.contains(&address)
                    || (cat == Category::Unknown) != (prev_category == Some(Category::Unknown))
                    || (cat == Category::DataOrVector) != (prev_category == Some(Category::DataOrVector)));
            if needs_blank {
                writeln!(buf)?;
            }

            let consumed = match tag {
                ByteType::Instruction => {
                    let mut end = i + 1;
                    while end < len && self.data_type[end] == ByteType::Operand {
                        end += 1;
                    }
                    let bytes: Vec<u8> = self.rom[i..end].to_vec();
                    let data_col = bytes.iter().map(|b| hex8_intel(*b)).collect::<Vec<_>>().join(" ");
                    let comment = self.folded_comment(i, end);
                    let text = self.disassembly[i].clone();
                    self.write_line(buf, source, Some(address), Some(&data_col), &text, &comment)?;
                    end - i
                }
                ByteType::Data16L if i + 1 < len && self.data_type[i + 1] == ByteType::Data16H => {
                    let value = self.rom[i] as usize | ((self.rom[i + 1] as usize) << 8);
                    let data_col = format!("{} {}", hex8_intel(self.rom[i]), hex8_intel(self.rom[i + 1]));
                    let text = format!("DW {}", hex16_intel(value));
                    let comment = self.folded_comment(i, i + 2);
                    self.write_line(buf, source, Some(address), Some(&data_col), &text, &comment)?;
                    2
                }
                ByteType::Vector16L if i + 1 < len && self.data_type[i + 1] == ByteType::Vector16H => {
                    let value = self.rom[i] as usize | ((self.rom[i + 1] as usize) << 8);
                    let data_col = format!("{} {}", hex8_intel(self.rom[i]), hex8_intel(self.rom[i + 1]));
                    let target_label = self.lookup_address(value, false, "");
                    let text = format!("DW {target_label}");
                    let comment = self.folded_comment(i, i + 2);
                    self.write_line(buf, source, Some(address), Some(&data_col), &text, &comment)?;
                    2
                }
                _ => {
                    let data_col = hex8_intel(self.rom[i]);
                    let mut comment = self.comments[i].clone();
                    if tag == ByteType::Unknown {
                        comment = if comment.is_empty() {
                            "(UNREACHABLE)".to_string()
                        } else {
                            format!("(UNREACHABLE) {comment}")
                        };
                    }
                    let text = format!("DB {}", hex8_intel(self.rom[i]));
                    self.write_line(buf, source, Some(address), Some(&data_col), &text, &comment)?;
                    1
                }
            };
            prev_category = Some(cat);
            i += consumed;
        }
        Ok(())
    }

    fn folded_comment(&self, start: usize, end: usize) -> String {
        self.comments[start..end]
            .iter()
            .filter(|c| !c.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn write_line(
        &self,
        buf: &mut String,
        source: bool,
        address: Option<usize>,
        data_col: Option<&str>,
        text: &str,
        comment: &str,
    ) -> Result<()> {
        let label = address.and_then(|a| self.label_map.get(&a)).cloned();
        let label_col = label.map(|n| format!("{n}:")).unwrap_or_default();

        if !source {
            let addr_col = address.map(hex16_intel).unwrap_or_default();
            write!(buf, "{addr_col:<6}{:<14}", data_col.unwrap_or(""))?;
        }
        write!(buf, "{label_col:<17}{text}")?;
        if !comment.is_empty() {
            write!(buf, "   ; {comment}")?;
        }
        writeln!(buf)?;
        Ok(())
    }

    fn render_xref_list(&mut self, buf: &mut String) -> Result<()> {
        self.section_header(buf, false, "Cross-Reference List")?;

        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        let dests: Vec<(usize, Vec<usize>)> =
            self.xref.iter().map(|(&d, s)| (d, s.clone())).collect();
        for (dest, sources) in dests {
            let dest_label = self.lookup_address(dest, false, "");
            let mut source_labels: Vec<String> =
                sources.iter().map(|&s| self.lookup_address(s, false, "")).collect();
            source_labels.sort();
            entries.push((dest_label, source_labels));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (dest_label, source_labels) in entries {
            writeln!(buf, "{dest_label}")?;
            for source_label in source_labels {
                writeln!(buf, "    {source_label}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::*;
    use crate::addr::Addr;
    use crate::cpu::CpuKind;

    #[test]
    fn test_listing_ends_with_end() {
        let mut d = Disassembler::new(vec![0x00], 0, CpuKind::Intel8080, BTreeMap::new(), BTreeMap::new());
        d.disassemble(&[Addr::from(0usize)], true, false, None, &[], &[]).unwrap();
        let text = d.listing(false).unwrap();
        assert!(text.trim_end().ends_with("END"));
    }

    #[test]
    fn test_unreached_byte_renders_unreachable() {
        let mut d = Disassembler::new(vec![0xFF, 0xFF], 0, CpuKind::Intel8080, BTreeMap::new(), BTreeMap::new());
        let text = d.listing(false).unwrap();
        assert!(text.contains("(UNREACHABLE)"));
    }

    #[test]
    fn test_source_mode_omits_address_column() {
        let mut d = Disassembler::new(vec![0x00], 0, CpuKind::Intel8080, BTreeMap::new(), BTreeMap::new());
        d.disassemble(&[Addr::from(0usize)], true, false, None, &[], &[]).unwrap();
        let listing_text = d.listing(false).unwrap();
        let source_text = d.listing(true).unwrap();
        assert!(listing_text.contains("0000h"));
        assert!(!source_text.contains("0000h  "));
    }

    #[test]
    fn test_external_reference_rendered_for_out_of_range_label() {
        let mut labels = BTreeMap::new();
        labels.insert(0xF000, "MONITOR".to_string());
        let mut d = Disassembler::new(vec![0x00], 0, CpuKind::Intel8080, labels, BTreeMap::new());
        let text = d.listing(false).unwrap();
        assert!(text.contains("MONITOR"));
        assert!(text.contains("External References"));
    }
}
