//! RCA CDP1802 decoder.
//!
//! Opcode decomposition is simpler than the 8080/Z80 family: `I = op >> 4` selects the
//! instruction group, `N = op & 0x0F` selects the register or sub-opcode within it. Grounded on
//! `rom_1802.py`.

use crate::addr::Addr;
use crate::disassembler::Disassembler;
use crate::fmt::hex8_intel;

fn imm8(d: &Disassembler, a: usize) -> u8 {
    d.byte_or_zero(a + 1)
}

pub(super) fn step(d: &mut Disassembler, address: Addr, create_label: bool) -> Vec<Addr> {
    let a = address.usize();
    let idx = d.idx(a);
    let op = d.byte_at(a);
    let i = op >> 4;
    let n = op & 0x0F;

    match i {
        0x0 => {
            if n == 0 {
                d.set_text(idx, "IDL".to_string());
            } else {
                d.set_text(idx, format!("LDN R{n}"));
            }
            vec![address + 1]
        }
        0x1 => {
            d.set_text(idx, format!("INC R{n}"));
            vec![address + 1]
        }
        0x2 => {
            d.set_text(idx, format!("DEC R{n}"));
            vec![address + 1]
        }
        0x3 => short_branch(d, address, n, create_label),
        0x4 => {
            d.set_text(idx, format!("LDA R{n}"));
            vec![address + 1]
        }
        0x5 => {
            d.set_text(idx, format!("STR R{n}"));
            vec![address + 1]
        }
        0x6 => io(d, address, n),
        0x7 => fixed_or_immediate_7(d, address, n),
        0x8 => {
            d.set_text(idx, format!("GLO R{n}"));
            vec![address + 1]
        }
        0x9 => {
            d.set_text(idx, format!("GHI R{n}"));
            vec![address + 1]
        }
        0xA => {
            d.set_text(idx, format!("PLO R{n}"));
            vec![address + 1]
        }
        0xB => {
            d.set_text(idx, format!("PHI R{n}"));
            vec![address + 1]
        }
        0xC => long_branch_or_skip(d, address, n, create_label),
        0xD => {
            d.set_text(idx, format!("SEP R{n}"));
            vec![]
        }
        0xE => {
            d.set_text(idx, format!("SEX R{n}"));
            vec![address + 1]
        }
        _ => fixed_or_immediate_f(d, address, n),
    }
}

/// `I=3` short branches: two-byte instructions whose target shares the page of the branch
/// *operand's* address, not the opcode's address.
fn short_branch(d: &mut Disassembler, address: Addr, n: u8, create_label: bool) -> Vec<Addr> {
    let a = address.usize();
    let idx = d.idx(a);
    let operand_addr = a + 1;
    let page = operand_addr & 0xFF00;
    let disp = imm8(d, a) as usize;
    d.tag_operand(operand_addr);
    let target = page | disp;

    match n {
        0 => {
            let label = d.lookup_address(target, create_label, "J_");
            d.set_text(idx, format!("BR {label}"));
            vec![Addr::from(target)]
        }
        8 => {
            d.set_text(idx, "SKP".to_string());
            vec![address + 2]
        }
        _ => {
            let mnemonic = match n {
                1 => "BQ",
                2 => "BZ",
                3 => "BDF",
                4 => "B1",
                5 => "B2",
                6 => "B3",
                7 => "B4",
                9 => "BNQ",
                0xA => "BNZ",
                0xB => "BNF",
                0xC => "BN1",
                0xD => "BN2",
                0xE => "BN3",
                _ => "BN4",
            };
            let label = d.lookup_address(target, create_label, "J_");
            d.set_text(idx, format!("{mnemonic} {label}"));
            vec![address + 2, Addr::from(target)]
        }
    }
}

fn io(d: &mut Disassembler, address: Addr, n: u8) -> Vec<Addr> {
    let idx = d.idx(address.usize());
    match n {
        0 => {
            d.set_text(idx, "IRX".to_string());
        }
        1..=7 => {
            let port = n as usize;
            let label = d.lookup_port(port, true, "P_");
            d.set_text(idx, format!("OUT {label}"));
        }
        8 => {
            d.set_error(idx, 0x60 | n);
            return vec![];
        }
        _ => {
            let port = (n & 7) as usize;
            let label = d.lookup_port(port, true, "P_");
            d.set_text(idx, format!("INP {label}"));
        }
    }
    vec![address + 1]
}

fn fixed_or_immediate_7(d: &mut Disassembler, address: Addr, n: u8) -> Vec<Addr> {
    let a = address.usize();
    let idx = d.idx(a);
    if n <= 0xB || n == 0xE {
        let mnemonic = match n {
            0 => "RET",
            1 => "DIS",
            2 => "LDXA",
            3 => "STXD",
            4 => "ADC",
            5 => "SDB",
            6 => "SHRC",
            7 => "SMB",
            8 => "SAV",
            9 => "MARK",
            0xA => "SEQ",
            0xB => "REQ",
            _ => "SHLC",
        };
        d.set_text(idx, mnemonic.to_string());
        vec![address + 1]
    } else {
        let mnemonic = match n {
            0xC => "ADDI",
            0xD => "SDBI",
            _ => "SMBI",
        };
        let value = imm8(d, a);
        d.tag_operand(a + 1);
        d.set_text(idx, format!("{mnemonic} {}", hex8_intel(value)));
        vec![address + 2]
    }
}

fn fixed_or_immediate_f(d: &mut Disassembler, address: Addr, n: u8) -> Vec<Addr> {
    let a = address.usize();
    let idx = d.idx(a);
    if n <= 7 || n == 0xE {
        let mnemonic = match n {
            0 => "LDX",
            1 => "OR",
            2 => "AND",
            3 => "XOR",
            4 => "ADD",
            5 => "SD",
            6 => "SHR",
            7 => "SM",
            _ => "SHL",
        };
        d.set_text(idx, mnemonic.to_string());
        vec![address + 1]
    } else {
        let mnemonic = match n {
            8 => "LDI",
            9 => "ORI",
            0xA => "ANI",
            0xB => "XRI",
            0xC => "ADI",
            0xD => "SDI",
            _ => "SMI",
        };
        let value = imm8(d, a);
        d.tag_operand(a + 1);
        d.set_text(idx, format!("{mnemonic} {}", hex8_intel(value)));
        vec![address + 2]
    }
}

/// `I=C` long branches and skips: three-byte branches, one-byte `NOP`, and the various skip forms.
fn long_branch_or_skip(d: &mut Disassembler, address: Addr, n: u8, create_label: bool) -> Vec<Addr> {
    let a = address.usize();
    let idx = d.idx(a);
    match n {
        0x4 => {
            d.set_text(idx, "NOP".to_string());
            vec![address + 1]
        }
        0x8 => {
            d.set_text(idx, "LSKP".to_string());
            vec![address + 3]
        }
        0x0 | 0x1 | 0x2 | 0x3 | 0x9 | 0xA | 0xB => {
            let target = (d.byte_or_zero(a + 1) as usize) << 8 | d.byte_or_zero(a + 2) as usize;
            d.tag_operand(a + 1);
            d.tag_operand(a + 2);
            let label = d.lookup_address(target, create_label, "J_");
            let mnemonic = match n {
                0 => "LBR",
                1 => "LBQ",
                2 => "LBZ",
                3 => "LBDF",
                9 => "LBNQ",
                0xA => "LBNZ",
                _ => "LBNF",
            };
            d.set_text(idx, format!("{mnemonic} {label}"));
            if n == 0 {
                vec![Addr::from(target)]
            } else {
                vec![address + 3, Addr::from(target)]
            }
        }
        _ => {
            let mnemonic = match n {
                5 => "LSNQ",
                6 => "LSNZ",
                7 => "LSNF",
                0xC => "LSIE",
                0xD => "LSQ",
                0xE => "LSZ",
                _ => "LSDF",
            };
            d.set_text(idx, mnemonic.to_string());
            vec![address + 3, address + 1]
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::*;
    use crate::cpu::CpuKind;
    use crate::disassembler::ByteType;

    fn disassembler(rom: Vec<u8>) -> Disassembler {
        Disassembler::new(rom, 0, CpuKind::Cdp1802, BTreeMap::new(), BTreeMap::new())
    }

    #[test]
    fn test_idl_at_reset() {
        let mut d = disassembler(vec![0x00]);
        d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "IDL");
    }

    #[test]
    fn test_unconditional_short_branch_page_relative() {
        // Opcode at 0x00FE, operand byte at 0x00FF holds displacement 0x10.
        let mut rom = vec![0u8; 0x100];
        rom[0xFE] = 0x30;
        rom[0xFF] = 0x10;
        let mut d = disassembler(rom);
        let successors = d.disasm_single(Addr::from(0x00FEusize), true);
        // Page comes from the operand's own address (0x00FF) masked to its page (0x0000), not
        // the opcode's page.
        assert_eq!(successors, vec![Addr::from(0x0010usize)]);
    }

    #[test]
    fn test_short_branch_respects_create_label_false() {
        // With create_label=false, BR must not populate label_map, matching the §8 round-trip
        // law that label_map stays exactly the user-supplied map when create_labels is false.
        let mut rom = vec![0u8; 0x100];
        rom[0xFE] = 0x30;
        rom[0xFF] = 0x10;
        let mut d = disassembler(rom);
        d.disasm_single(Addr::from(0x00FEusize), false);
        assert!(d.label_map.is_empty());
        assert_eq!(d.disassembly[0xFE], "BR 0010h");
    }

    #[test]
    fn test_conditional_short_branch_respects_create_label_false() {
        let mut rom = vec![0u8; 0x10];
        rom[0] = 0x31; // BQ
        rom[1] = 0x04;
        let mut d = disassembler(rom);
        d.disasm_single(Addr::from(0usize), false);
        assert!(d.label_map.is_empty());
        assert_eq!(d.disassembly[0], "BQ 0004h");
    }

    #[test]
    fn test_short_branch_page_crosses_boundary_from_operand_address() {
        // Opcode at 0x02FF, operand byte at 0x0300 holds displacement 0x00: target page 0x0300,
        // matching the operand's own address rather than the opcode's (which would give 0x0200).
        let mut rom = vec![0u8; 0x400];
        rom[0x2FF] = 0x30;
        rom[0x300] = 0x00;
        let mut d = disassembler(rom);
        let successors = d.disasm_single(Addr::from(0x02FFusize), true);
        assert_eq!(successors, vec![Addr::from(0x0300usize)]);
    }

    #[test]
    fn test_unconditional_skip_advances_two() {
        let mut d = disassembler(vec![0x38, 0x00]);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "SKP");
        assert_eq!(successors, vec![Addr::from(2usize)]);
    }

    #[test]
    fn test_reserved_io_opcode_is_error() {
        let mut d = disassembler(vec![0x68]);
        d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.data_type[0], ByteType::Error);
    }

    #[test]
    fn test_sep_has_no_successors() {
        let mut d = disassembler(vec![0xD5]); // SEP R5
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert!(successors.is_empty());
    }

    #[test]
    fn test_long_branch_unconditional_has_no_fallthrough() {
        let mut d = disassembler(vec![0xC0, 0x10, 0x00]);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(successors, vec![Addr::from(0x1000usize)]);
    }

    #[test]
    fn test_op7x_ret_and_dis_are_distinct_fixed_opcodes() {
        let mut d = disassembler(vec![0x70, 0x71]);
        d.disasm_single(Addr::from(0usize), true);
        d.disasm_single(Addr::from(1usize), true);
        assert_eq!(d.disassembly[0], "RET");
        assert_eq!(d.disassembly[1], "DIS");
    }

    #[test]
    fn test_op7x_seq_and_req_not_adcx_sdbx() {
        let mut d = disassembler(vec![0x7A, 0x7B]);
        d.disasm_single(Addr::from(0usize), true);
        d.disasm_single(Addr::from(1usize), true);
        assert_eq!(d.disassembly[0], "SEQ");
        assert_eq!(d.disassembly[1], "REQ");
    }

    #[test]
    fn test_op7x_addi_immediate_not_adci() {
        let mut d = disassembler(vec![0x7C, 0x42]);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "ADDI 42h");
        assert_eq!(d.data_type[1], ByteType::Operand);
        assert_eq!(successors, vec![Addr::from(2usize)]);
    }

    #[test]
    fn test_conditional_long_skip_successors_are_three_then_one() {
        // LSNQ (0xC5): skip target (address+3) comes before the fall-through (address+1).
        let mut d = disassembler(vec![0xC5, 0x00, 0x00]);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "LSNQ");
        assert_eq!(successors, vec![Addr::from(3usize), Addr::from(1usize)]);
    }

    #[test]
    fn test_unconditional_long_skip_has_single_successor() {
        let mut d = disassembler(vec![0xC8, 0x00, 0x00]);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "LSKP");
        assert_eq!(successors, vec![Addr::from(3usize)]);
    }

    #[test]
    fn test_opcx_high_skip_mnemonics_lsie_lsq_lsz_lsdf() {
        let mut d = disassembler(vec![0xCC, 0xCD, 0xCE, 0xCF]);
        for i in 0..4 {
            d.disasm_single(Addr::from(i), true);
        }
        assert_eq!(d.disassembly[0], "LSIE");
        assert_eq!(d.disassembly[1], "LSQ");
        assert_eq!(d.disassembly[2], "LSZ");
        assert_eq!(d.disassembly[3], "LSDF");
    }
}
