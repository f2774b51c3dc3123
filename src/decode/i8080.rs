//! Intel 8080 / 8085 decoder.
//!
//! The 8085 is decoded with exactly this table: it is a strict superset of the 8080 at the opcode
//! level, and neither CPU variant defines any extra instruction this disassembler needs to
//! distinguish. Grounded on `rom_8080.py`'s opcode decomposition (`x`, `y`, `z`, `p`, `q`) and
//! per-group dispatch tables.

use crate::addr::Addr;
use crate::disassembler::Disassembler;
use crate::fmt::hex8_intel;

const R: [&str; 8] = ["B", "C", "D", "E", "H", "L", "M", "A"];
const RP: [&str; 4] = ["B", "D", "H", "SP"];
const RP2: [&str; 4] = ["B", "D", "H", "PSW"];
const CC: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];
const ALU: [&str; 8] = ["ADD", "ADC", "SUB", "SBC", "ANA", "XRA", "ORA", "CMP"];

fn imm8(d: &Disassembler, a: usize) -> u8 {
    d.byte_or_zero(a + 1)
}

fn imm16(d: &Disassembler, a: usize) -> usize {
    d.byte_or_zero(a + 1) as usize | ((d.byte_or_zero(a + 2) as usize) << 8)
}

pub(super) fn step(d: &mut Disassembler, address: Addr, create_label: bool) -> Vec<Addr> {
    let a = address.usize();
    let idx = d.idx(a);
    let op = d.byte_at(a);
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = (y >> 1) as usize;
    let q = (y & 1) as usize;

    match x {
        0 => match z {
            0 => {
                if y == 0 {
                    d.set_text(idx, "NOP".to_string());
                    vec![address + 1]
                } else {
                    d.set_error(idx, op);
                    vec![]
                }
            }
            1 => {
                if q == 0 {
                    let value = imm16(d, a);
                    d.set_text(idx, format!("LXI {}, {}", RP[p], crate::fmt::hex16_intel(value)));
                    d.tag_operand(a + 1);
                    d.tag_operand(a + 2);
                    vec![address + 3]
                } else {
                    d.set_text(idx, format!("DAD {}", RP[p]));
                    vec![address + 1]
                }
            }
            2 => {
                if q == 0 {
                    match p {
                        0 => {
                            d.set_text(idx, "STAX B".to_string());
                            vec![address + 1]
                        }
                        1 => {
                            d.set_text(idx, "STAX D".to_string());
                            vec![address + 1]
                        }
                        2 => {
                            let value = imm16(d, a);
                            d.tag_operand(a + 1);
                            d.tag_operand(a + 2);
                            d.set_data16(value, Some(address));
                            let label = d.lookup_address(value, create_label, "D_");
                            d.set_text(idx, format!("SHLD {label}"));
                            vec![address + 3]
                        }
                        _ => {
                            let value = imm16(d, a);
                            d.tag_operand(a + 1);
                            d.tag_operand(a + 2);
                            d.set_data8(value, Some(address));
                            let label = d.lookup_address(value, create_label, "D_");
                            d.set_text(idx, format!("STA {label}"));
                            vec![address + 3]
                        }
                    }
                } else {
                    match p {
                        0 => {
                            d.set_text(idx, "LDAX B".to_string());
                            vec![address + 1]
                        }
                        1 => {
                            d.set_text(idx, "LDAX D".to_string());
                            vec![address + 1]
                        }
                        2 => {
                            let value = imm16(d, a);
                            d.tag_operand(a + 1);
                            d.tag_operand(a + 2);
                            d.set_data16(value, Some(address));
                            let label = d.lookup_address(value, create_label, "D_");
                            d.set_text(idx, format!("LHLD {label}"));
                            vec![address + 3]
                        }
                        _ => {
                            let value = imm16(d, a);
                            d.tag_operand(a + 1);
                            d.tag_operand(a + 2);
                            d.set_data8(value, Some(address));
                            let label = d.lookup_address(value, create_label, "D_");
                            d.set_text(idx, format!("LDA {label}"));
                            vec![address + 3]
                        }
                    }
                }
            }
            3 => {
                let mnemonic = if q == 0 { "INX" } else { "DCX" };
                d.set_text(idx, format!("{mnemonic} {}", RP[p]));
                vec![address + 1]
            }
            4 => {
                d.set_text(idx, format!("INR {}", R[y as usize]));
                vec![address + 1]
            }
            5 => {
                d.set_text(idx, format!("DCR {}", R[y as usize]));
                vec![address + 1]
            }
            6 => {
                let value = imm8(d, a);
                d.tag_operand(a + 1);
                d.set_text(idx, format!("MVI {}, {}", R[y as usize], hex8_intel(value)));
                vec![address + 2]
            }
            _ => {
                let mnemonic = match y {
                    0 => "RLC",
                    1 => "RRC",
                    2 => "RAL",
                    3 => "RAR",
                    4 => "DAA",
                    5 => "CMA",
                    6 => "STC",
                    _ => "CMC",
                };
                d.set_text(idx, mnemonic.to_string());
                vec![address + 1]
            }
        },
        1 => {
            if y == 6 && z == 6 {
                d.set_text(idx, "HLT".to_string());
                vec![address + 1]
            } else {
                d.set_text(idx, format!("MOV {}, {}", R[y as usize], R[z as usize]));
                vec![address + 1]
            }
        }
        2 => {
            d.set_text(idx, format!("{} {}", ALU[y as usize], R[z as usize]));
            vec![address + 1]
        }
        _ => match z {
            0 => {
                d.set_text(idx, format!("R{}", CC[y as usize]));
                vec![address + 1]
            }
            1 => {
                if q == 0 {
                    d.set_text(idx, format!("POP {}", RP2[p]));
                    vec![address + 1]
                } else {
                    match p {
                        0 => {
                            d.set_text(idx, "RET".to_string());
                            vec![]
                        }
                        2 => {
                            d.set_text(idx, "PCHL".to_string());
                            vec![]
                        }
                        3 => {
                            d.set_text(idx, "SPHL".to_string());
                            vec![address + 1]
                        }
                        _ => {
                            d.set_error(idx, op);
                            vec![]
                        }
                    }
                }
            }
            2 => {
                let target = imm16(d, a);
                d.tag_operand(a + 1);
                d.tag_operand(a + 2);
                let label = d.lookup_address(target, create_label, "J_");
                d.add_xref(a, target);
                d.set_text(idx, format!("J{} {label}", CC[y as usize]));
                vec![address + 3, Addr::from(target)]
            }
            3 => match y {
                0 => {
                    let target = imm16(d, a);
                    d.tag_operand(a + 1);
                    d.tag_operand(a + 2);
                    let label = d.lookup_address(target, create_label, "J_");
                    d.add_xref(a, target);
                    d.set_text(idx, format!("JMP {label}"));
                    vec![Addr::from(target)]
                }
                2 => {
                    let port = imm8(d, a) as usize;
                    d.tag_operand(a + 1);
                    let label = d.lookup_port(port, create_label, "P_");
                    d.set_text(idx, format!("OUT {label}"));
                    vec![address + 2]
                }
                3 => {
                    let port = imm8(d, a) as usize;
                    d.tag_operand(a + 1);
                    let label = d.lookup_port(port, create_label, "P_");
                    d.set_text(idx, format!("IN {label}"));
                    vec![address + 2]
                }
                4 => {
                    d.set_text(idx, "XTHL".to_string());
                    vec![address + 1]
                }
                5 => {
                    d.set_text(idx, "XCHG".to_string());
                    vec![address + 1]
                }
                6 => {
                    d.set_text(idx, "DI".to_string());
                    vec![address + 1]
                }
                7 => {
                    d.set_text(idx, "EI".to_string());
                    vec![address + 1]
                }
                _ => {
                    d.set_error(idx, op);
                    vec![]
                }
            },
            4 => {
                let target = imm16(d, a);
                d.tag_operand(a + 1);
                d.tag_operand(a + 2);
                let label = d.lookup_address(target, create_label, "C_");
                d.add_xref(a, target);
                d.set_text(idx, format!("C{} {label}", CC[y as usize]));
                vec![address + 3, Addr::from(target)]
            }
            5 => {
                if q == 0 {
                    d.set_text(idx, format!("PUSH {}", RP2[p]));
                    vec![address + 1]
                } else if p == 0 {
                    let target = imm16(d, a);
                    d.tag_operand(a + 1);
                    d.tag_operand(a + 2);
                    let label = d.lookup_address(target, create_label, "C_");
                    d.add_xref(a, target);
                    d.set_text(idx, format!("CALL {label}"));
                    vec![Addr::from(target)]
                } else {
                    d.set_error(idx, op);
                    vec![]
                }
            }
            6 => {
                let value = imm8(d, a);
                d.tag_operand(a + 1);
                d.set_text(idx, format!("{} {}", ALU[y as usize], hex8_intel(value)));
                vec![address + 2]
            }
            _ => {
                let target = (y as usize) * 8;
                d.add_xref(a, target);
                d.set_text(idx, format!("RST {y}"));
                vec![Addr::from(target)]
            }
        },
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::*;
    use crate::cpu::CpuKind;
    use crate::disassembler::ByteType;

    fn disassembler(rom: Vec<u8>) -> Disassembler {
        Disassembler::new(rom, 0, CpuKind::Intel8080, BTreeMap::new(), BTreeMap::new())
    }

    #[test]
    fn test_nop_advances_one_byte() {
        let mut d = disassembler(vec![0x00]);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(successors, vec![Addr::from(1usize)]);
        assert_eq!(d.disassembly[0], "NOP");
    }

    #[test]
    fn test_hlt_has_fallthrough_successor() {
        let mut d = disassembler(vec![0x76]);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(successors, vec![Addr::from(1usize)]);
        assert_eq!(d.disassembly[0], "HLT");
    }

    #[test]
    fn test_jmp_targets_only_branch() {
        let mut d = disassembler(vec![0xC3, 0x00, 0x10]);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(successors, vec![Addr::from(0x1000usize)]);
        assert_eq!(d.data_type[1], ByteType::Operand);
        assert_eq!(d.data_type[2], ByteType::Operand);
    }

    #[test]
    fn test_conditional_jump_yields_fallthrough_then_target() {
        let mut d = disassembler(vec![0xCA, 0x00, 0x10]);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(successors, vec![Addr::from(3usize), Addr::from(0x1000usize)]);
    }

    #[test]
    fn test_rst_has_no_fallthrough() {
        let mut d = disassembler(vec![0xCF]); // RST 1
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(successors, vec![Addr::from(8usize)]);
    }

    #[test]
    fn test_rst_operand_is_plain_decimal_not_a_label() {
        // RST 1 must render "RST 1", never a label like "RST C_0008" or a hex literal.
        let mut d = disassembler(vec![0xCF]);
        d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "RST 1");
    }

    #[test]
    fn test_invalid_opcode_tags_error() {
        let mut d = disassembler(vec![0x08]); // z=0, y=1: invalid on 8080
        d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.data_type[0], ByteType::Error);
    }

    #[test]
    fn test_sta_marks_target_data8_and_adds_label() {
        let mut d = disassembler(vec![0x32, 0x00, 0x20]);
        d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "STA D_2000");
    }
}
