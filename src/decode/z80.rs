//! Zilog Z80 decoder.
//!
//! Extends the 8080's `x/y/z/p/q` decomposition with the Z80's relative jumps, exchange
//! instructions, and the `CB`/`ED`/`DD`/`FD` prefixed extended tables. Grounded on `rom_z80.py`.
//!
//! Three behaviours are carried over from that source verbatim rather than "corrected", per the
//! preserve-as-is design notes:
//! - `JR`/`DJNZ` displacement is added to the opcode's own address, not the address of the byte
//!   following the displacement (the conventional Z80 interpretation).
//! - The `CB`-prefixed `BIT`/`RES`/`SET` bit index comes from the *outer* opcode's `y` field
//!   (always `1`, since `0xCB` decomposes to `x=3,y=1,z=3`) rather than the second byte's own `y2`.
//!   Every `BIT`/`RES`/`SET` this decoder emits therefore names bit `1`, regardless of `op2`.
//! - `DD`/`FD` prefixes are not implemented; unlike the source, which aborts the run, this decoder
//!   degrades gracefully (see below).

use crate::addr::Addr;
use crate::disassembler::{ByteType, Disassembler};
use crate::fmt::{hex16_intel, hex8_intel, signed_byte};

const R: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];
const RP: [&str; 4] = ["BC", "DE", "HL", "SP"];
const RP2: [&str; 4] = ["BC", "DE", "HL", "AF"];
const CC: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];
const CC4: [&str; 4] = ["NZ", "Z", "NC", "C"];
const ALU: [&str; 8] = ["ADD A,", "ADC A,", "SUB ", "SBC A,", "AND ", "XOR ", "OR ", "CP "];
const ROT: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SLL", "SRL"];

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
            0 => match y {
                0 => {
                    d.set_text(idx, "NOP".to_string());
                    vec![address + 1]
                }
                1 => {
                    d.set_text(idx, "EX AF, AF'".to_string());
                    vec![address + 1]
                }
                2 => {
                    // Displacement is relative to this opcode's own address, a bug in the
                    // original decoder preserved here rather than fixed.
                    let disp = signed_byte(imm8(d, a));
                    d.tag_operand(a + 1);
                    let target = ((a as isize + disp as isize) & 0xFFFF) as usize;
                    let label = d.lookup_address(target, create_label, "J_");
                    d.set_text(idx, format!("DJNZ {label}"));
                    vec![address + 2, Addr::from(target)]
                }
                3 => {
                    let disp = signed_byte(imm8(d, a));
                    d.tag_operand(a + 1);
                    let target = ((a as isize + disp as isize) & 0xFFFF) as usize;
                    let label = d.lookup_address(target, create_label, "J_");
                    d.set_text(idx, format!("JR {label}"));
                    vec![Addr::from(target)]
                }
                _ => {
                    let disp = signed_byte(imm8(d, a));
                    d.tag_operand(a + 1);
                    let target = ((a as isize + disp as isize) & 0xFFFF) as usize;
                    let label = d.lookup_address(target, create_label, "J_");
                    d.set_text(idx, format!("JR {}, {label}", CC4[(y - 4) as usize]));
                    vec![address + 2, Addr::from(target)]
                }
            },
            1 => {
                if q == 0 {
                    let value = imm16(d, a);
                    d.tag_operand(a + 1);
                    d.tag_operand(a + 2);
                    d.set_text(idx, format!("LD {}, {}", RP[p], hex16_intel(value)));
                    vec![address + 3]
                } else {
                    d.set_text(idx, format!("ADD HL, {}", RP[p]));
                    vec![address + 1]
                }
            }
            2 => {
                if q == 0 {
                    match p {
                        0 => {
                            d.set_text(idx, "LD (BC), A".to_string());
                            vec![address + 1]
                        }
                        1 => {
                            d.set_text(idx, "LD (DE), A".to_string());
                            vec![address + 1]
                        }
                        2 => {
                            let value = imm16(d, a);
                            d.tag_operand(a + 1);
                            d.tag_operand(a + 2);
                            d.set_data16(value, Some(address));
                            let label = d.lookup_address(value, create_label, "D_");
                            d.set_text(idx, format!("LD ({label}), HL"));
                            vec![address + 3]
                        }
                        _ => {
                            let value = imm16(d, a);
                            d.tag_operand(a + 1);
                            d.tag_operand(a + 2);
                            d.set_data8(value, Some(address));
                            let label = d.lookup_address(value, create_label, "D_");
                            d.set_text(idx, format!("LD ({label}), A"));
                            vec![address + 3]
                        }
                    }
                } else {
                    match p {
                        0 => {
                            d.set_text(idx, "LD A, (BC)".to_string());
                            vec![address + 1]
                        }
                        1 => {
                            d.set_text(idx, "LD A, (DE)".to_string());
                            vec![address + 1]
                        }
                        2 => {
                            let value = imm16(d, a);
                            d.tag_operand(a + 1);
                            d.tag_operand(a + 2);
                            d.set_data16(value, Some(address));
                            let label = d.lookup_address(value, create_label, "D_");
                            d.set_text(idx, format!("LD HL, ({label})"));
                            vec![address + 3]
                        }
                        _ => {
                            let value = imm16(d, a);
                            d.tag_operand(a + 1);
                            d.tag_operand(a + 2);
                            d.set_data8(value, Some(address));
                            let label = d.lookup_address(value, create_label, "D_");
                            d.set_text(idx, format!("LD A, ({label})"));
                            vec![address + 3]
                        }
                    }
                }
            }
            3 => {
                let mnemonic = if q == 0 { "INC" } else { "DEC" };
                d.set_text(idx, format!("{mnemonic} {}", RP[p]));
                vec![address + 1]
            }
            4 => {
                d.set_text(idx, format!("INC {}", R[y as usize]));
                vec![address + 1]
            }
            5 => {
                d.set_text(idx, format!("DEC {}", R[y as usize]));
                vec![address + 1]
            }
            6 => {
                let value = imm8(d, a);
                d.tag_operand(a + 1);
                d.set_text(idx, format!("LD {}, {}", R[y as usize], hex8_intel(value)));
                vec![address + 2]
            }
            _ => {
                let mnemonic = match y {
                    0 => "RLCA",
                    1 => "RRCA",
                    2 => "RLA",
                    3 => "RRA",
                    4 => "DAA",
                    5 => "CPL",
                    6 => "SCF",
                    _ => "CCF",
                };
                d.set_text(idx, mnemonic.to_string());
                vec![address + 1]
            }
        },
        1 => {
            if y == 6 && z == 6 {
                d.set_text(idx, "HALT".to_string());
                vec![address + 1]
            } else {
                d.set_text(idx, format!("LD {}, {}", R[y as usize], R[z as usize]));
                vec![address + 1]
            }
        }
        2 => {
            d.set_text(idx, format!("{}{}", ALU[y as usize], R[z as usize]));
            vec![address + 1]
        }
        _ => match z {
            0 => {
                d.set_text(idx, format!("RET {}", CC[y as usize]));
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
                        1 => {
                            d.set_text(idx, "EXX".to_string());
                            vec![address + 1]
                        }
                        2 => {
                            d.set_text(idx, "JP (HL)".to_string());
                            vec![]
                        }
                        _ => {
                            d.set_text(idx, "LD SP, HL".to_string());
                            vec![address + 1]
                        }
                    }
                }
            }
            2 => {
                let target = imm16(d, a);
                d.tag_operand(a + 1);
                d.tag_operand(a + 2);
                let label = d.lookup_address(target, create_label, "J_");
                d.set_text(idx, format!("JP {}, {label}", CC[y as usize]));
                vec![address + 3, Addr::from(target)]
            }
            3 => match y {
                0 => {
                    let target = imm16(d, a);
                    d.tag_operand(a + 1);
                    d.tag_operand(a + 2);
                    let label = d.lookup_address(target, create_label, "J_");
                    d.set_text(idx, format!("JP {label}"));
                    vec![Addr::from(target)]
                }
                1 => decode_cb(d, address, y),
                2 => {
                    let port = imm8(d, a) as usize;
                    d.tag_operand(a + 1);
                    let label = d.lookup_port(port, create_label, "P_");
                    d.set_text(idx, format!("OUT ({label}), A"));
                    vec![address + 2]
                }
                3 => {
                    let port = imm8(d, a) as usize;
                    d.tag_operand(a + 1);
                    let label = d.lookup_port(port, create_label, "P_");
                    d.set_text(idx, format!("IN A, ({label})"));
                    vec![address + 2]
                }
                4 => {
                    d.set_text(idx, "EX (SP), HL".to_string());
                    vec![address + 1]
                }
                5 => {
                    d.set_text(idx, "EX DE, HL".to_string());
                    vec![address + 1]
                }
                6 => {
                    d.set_text(idx, "DI".to_string());
                    vec![address + 1]
                }
                _ => {
                    d.set_text(idx, "EI".to_string());
                    vec![address + 1]
                }
            },
            4 => {
                let target = imm16(d, a);
                d.tag_operand(a + 1);
                d.tag_operand(a + 2);
                let label = d.lookup_address(target, create_label, "C_");
                d.set_text(idx, format!("CALL {}, {label}", CC[y as usize]));
                vec![address + 3, Addr::from(target)]
            }
            5 => {
                if q == 0 {
                    d.set_text(idx, format!("PUSH {}", RP2[p]));
                    vec![address + 1]
                } else {
                    match p {
                        0 => {
                            let target = imm16(d, a);
                            d.tag_operand(a + 1);
                            d.tag_operand(a + 2);
                            let label = d.lookup_address(target, create_label, "C_");
                            d.set_text(idx, format!("CALL {label}"));
                            vec![Addr::from(target)]
                        }
                        2 => decode_ed(d, address, create_label),
                        _ => degrade_dd_fd(d, address),
                    }
                }
            }
            6 => {
                let value = imm8(d, a);
                d.tag_operand(a + 1);
                d.set_text(idx, format!("{}{}", ALU[y as usize], hex8_intel(value)));
                vec![address + 2]
            }
            _ => {
                let target = (y as usize) * 8;
                d.set_text(idx, format!("RST {target}"));
                vec![Addr::from(target)]
            }
        },
    }
}

/// Degrades a `DD`/`FD` prefix byte to an `Error` tag instead of aborting the run.
fn degrade_dd_fd(d: &mut Disassembler, address: Addr) -> Vec<Addr> {
    let idx = d.idx(address.usize());
    d.data_type[idx] = ByteType::Error;
    d.append_comment(idx, "DD/FD prefixed instructions not implemented yet");
    tracing::warn!(address = address.usize(), "DD/FD prefix degraded to Error");
    vec![address + 1]
}

fn decode_cb(d: &mut Disassembler, address: Addr, outer_y: u8) -> Vec<Addr> {
    let a = address.usize();
    let op2_addr = a + 1;
    let op2 = d.byte_or_zero(op2_addr);
    d.tag_operand(op2_addr);
    let idx = d.idx(a);
    let x2 = op2 >> 6;
    let z2 = op2 & 7;
    match x2 {
        0 => {
            let y2 = ((op2 >> 3) & 7) as usize;
            d.set_text(idx, format!("{} {}", ROT[y2], R[z2 as usize]));
        }
        1 => {
            d.set_text(idx, format!("BIT {}, {}", outer_y, R[z2 as usize]));
        }
        2 => {
            d.set_text(idx, format!("RES {}, {}", outer_y, R[z2 as usize]));
        }
        _ => {
            d.set_text(idx, format!("SET {}, {}", outer_y, R[z2 as usize]));
        }
    }
    vec![address + 2]
}

fn decode_ed(d: &mut Disassembler, address: Addr, create_label: bool) -> Vec<Addr> {
    let a = address.usize();
    let op2_addr = a + 1;
    let op2 = d.byte_or_zero(op2_addr);
    d.tag_operand(op2_addr);
    let idx = d.idx(a);
    let x2 = op2 >> 6;
    let y2 = (op2 >> 3) & 7;
    let z2 = op2 & 7;
    let p2 = (y2 >> 1) as usize;
    let q2 = y2 & 1;

    match x2 {
        1 => match z2 {
            0 => {
                if y2 == 6 {
                    d.set_text(idx, "IN (C)".to_string());
                } else {
                    d.set_text(idx, format!("IN {}, (C)", R[y2 as usize]));
                }
                vec![address + 2]
            }
            1 => {
                if y2 == 6 {
                    d.set_text(idx, "OUT (C), 0".to_string());
                } else {
                    d.set_text(idx, format!("OUT (C), {}", R[y2 as usize]));
                }
                vec![address + 2]
            }
            2 => {
                let mnemonic = if q2 == 0 { "SBC" } else { "ADC" };
                d.set_text(idx, format!("{mnemonic} HL, {}", RP[p2]));
                vec![address + 2]
            }
            3 => {
                let value = imm16(d, op2_addr);
                d.tag_operand(op2_addr + 1);
                d.tag_operand(op2_addr + 2);
                d.set_data16(value, Some(address));
                let label = d.lookup_address(value, create_label, "D_");
                if q2 == 0 {
                    d.set_text(idx, format!("LD ({label}), {}", RP[p2]));
                } else {
                    d.set_text(idx, format!("LD {}, ({label})", RP[p2]));
                }
                vec![address + 4]
            }
            4 => {
                d.set_text(idx, "NEG".to_string());
                vec![address + 2]
            }
            5 => {
                let mnemonic = if y2 == 1 { "RETI" } else { "RETN" };
                d.set_text(idx, mnemonic.to_string());
                vec![]
            }
            6 => {
                let imode = ["0", "0/1", "1", "2", "0", "0/1", "1", "2"][y2 as usize];
                d.set_text(idx, format!("IM {imode}"));
                vec![address + 2]
            }
            _ => {
                let mnemonic = match y2 {
                    0 => "LD I, A",
                    1 => "LD R, A",
                    2 => "LD A, I",
                    3 => "LD A, R",
                    4 => "RRD",
                    5 => "RLD",
                    _ => "NOP",
                };
                d.set_text(idx, mnemonic.to_string());
                vec![address + 2]
            }
        },
        2 if z2 <= 3 && y2 >= 4 => {
            // Indexed [y2-4][z2], not a mechanical family+suffix concatenation: the repeating
            // OUT forms are named OTIR/OTDR, not OUTIR/OUTDR.
            const BLI: [[&str; 4]; 4] = [
                ["LDI", "CPI", "INI", "OUTI"],
                ["LDD", "CPD", "IND", "OUTD"],
                ["LDIR", "CPIR", "INIR", "OTIR"],
                ["LDDR", "CPDR", "INDR", "OTDR"],
            ];
            d.set_text(idx, BLI[(y2 - 4) as usize][z2 as usize].to_string());
            vec![address + 2]
        }
        _ => {
            // The second byte was already tagged Operand above; re-tag it Error too so it
            // doesn't dangle as an Operand with no preceding Instruction byte.
            d.set_error(idx, op2);
            let idx2 = d.idx(op2_addr);
            d.data_type[idx2] = ByteType::Error;
            vec![]
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
        Disassembler::new(rom, 0, CpuKind::Z80, BTreeMap::new(), BTreeMap::new())
    }

    #[test]
    fn test_jr_displacement_relative_to_opcode_address() {
        // JR with a +2 displacement, opcode at address 0x0010.
        let mut rom = vec![0u8; 0x20];
        rom[0x10] = 0x18;
        rom[0x11] = 0x02;
        let mut d = disassembler(rom);
        let successors = d.disasm_single(Addr::from(0x10usize), true);
        // Bug preserved: target = opcode address (0x10) + disp (2) = 0x12, not 0x13.
        assert_eq!(successors, vec![Addr::from(0x12usize)]);
    }

    #[test]
    fn test_djnz_has_fallthrough_and_target() {
        let mut rom = vec![0u8; 0x10];
        rom[0] = 0x10;
        rom[1] = 0x04;
        let mut d = disassembler(rom);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(successors, vec![Addr::from(2usize), Addr::from(4usize)]);
    }

    #[test]
    fn test_cb_bit_uses_outer_y_not_inner() {
        // CB 47: BIT 0, A by the conventional encoding (y2=0), but this decoder names bit 1
        // (the outer y of the 0xCB opcode itself) regardless of op2.
        let mut d = disassembler(vec![0xCB, 0x47]);
        d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "BIT 1, A");
    }

    #[test]
    fn test_ed_block_instruction_names_otir_not_outir() {
        // ED B3: x2=2, y2=6, z2=3 -> OTIR, not the mechanically concatenated "OUTIR".
        let mut d = disassembler(vec![0xED, 0xB3]);
        d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "OTIR");
    }

    #[test]
    fn test_ed_in_c_with_y2_6_has_no_register() {
        // ED 70: IN (C), no destination register, unlike the other y2 values.
        let mut d = disassembler(vec![0xED, 0x70]);
        d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "IN (C)");
    }

    #[test]
    fn test_ed_out_c_with_y2_6_writes_literal_zero() {
        // ED 71: OUT (C), 0.
        let mut d = disassembler(vec![0xED, 0x71]);
        d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "OUT (C), 0");
    }

    #[test]
    fn test_ed_ld_absolute_marks_target_data16() {
        // ED 43: LD (nnnn), BC — four-byte instruction, q2=0, p2=0. Target 0x0008 is in-range of
        // a 16-byte ROM so the set_data16 side effect is observable.
        let mut rom = vec![0u8; 16];
        rom[0] = 0xED;
        rom[1] = 0x43;
        rom[2] = 0x08;
        rom[3] = 0x00;
        let mut d = disassembler(rom);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(successors, vec![Addr::from(4usize)]);
        assert_eq!(d.data_type[8], ByteType::Data16L);
        assert_eq!(d.data_type[9], ByteType::Data16H);
    }

    #[test]
    fn test_dd_prefix_degrades_to_error_not_panic() {
        let mut d = disassembler(vec![0xDD, 0x21]);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.data_type[0], ByteType::Error);
        assert_eq!(successors, vec![Addr::from(1usize)]);
    }

    #[test]
    fn test_halt_distinct_from_8080_hlt_mnemonic() {
        let mut d = disassembler(vec![0x76]);
        d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "HALT");
    }

    #[test]
    fn test_rst_operand_is_plain_decimal_target_not_a_label() {
        // RST 08h (0xCF): must render "RST 8", never a label, and must not add a cross-reference
        // (the original rom_z80.py never calls add_xref for any branch/call/RST).
        let mut d = disassembler(vec![0xCF]);
        let successors = d.disasm_single(Addr::from(0usize), true);
        assert_eq!(d.disassembly[0], "RST 8");
        assert_eq!(successors, vec![Addr::from(8usize)]);
        assert!(d.xref.is_empty());
    }

    #[test]
    fn test_jp_and_call_do_not_add_xref() {
        let mut d = disassembler(vec![0xC3, 0x00, 0x10]); // JP 0x1000
        d.disasm_single(Addr::from(0usize), true);
        assert!(d.xref.is_empty());
    }
}
