//! # romdis
//!
//! A retargetable static disassembler for legacy 8-bit microprocessor ROM images. Given a flat
//! binary image, a base load address, and one or more entry points, it produces an annotated
//! assembly listing by following reachable control flow, classifying every byte as instruction,
//! operand, data, vector, or unreached, and synthesising symbolic labels for referenced memory
//! locations and I/O ports.
//!
//! ## Core Features
//!
//! - **Classification store**: a per-byte type map, disassembly text, comments, label/port maps,
//!   cross-reference index, and vector registries ([`disassembler`]).
//! - **Reachability traversal**: an explicit worklist-driven visitor over the classification store
//!   ([`Disassembler::disassemble`](disassembler::Disassembler::disassemble)).
//! - **Per-CPU decoders**: Intel 8080, Intel 8085 (an 8080 superset), Zilog Z80, and RCA CDP1802.
//! - **Listing renderer**: two-column listing or label-first source output
//!   ([`Disassembler::listing`](disassembler::Disassembler::listing)).
//! - **CPU registry**: CPU tag to decoder, default entries, labels, and ports ([`cpu`]).
//!
//! ## Architecture
//!
//! romdis is built around one owned classification store, [`disassembler::Disassembler`], mutated
//! in turn by pre-classification hints, the traversal, and the decoders, then read once by the
//! renderer. No trait objects stand in for the four decoders; dispatch is a `match` on
//! [`cpu::CpuKind`] over free functions, since the set of supported CPUs is closed.
//!
//! ## Example Usage
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use romdis::addr::Addr;
//! use romdis::cpu::CpuKind;
//! use romdis::disassembler::Disassembler;
//!
//! let rom = vec![0x00, 0x76]; // NOP, HLT
//! let mut d = Disassembler::new(rom, 0, CpuKind::Intel8080, BTreeMap::new(), BTreeMap::new());
//! d.disassemble(&[Addr::from(0usize)], true, false, None, &[], &[]).unwrap();
//! let listing = d.listing(false).unwrap();
//! assert!(listing.contains("NOP"));
//! ```

pub mod addr;
pub mod cpu;
mod decode;
pub mod disassembler;
pub mod errors;
pub mod fmt;
mod listing;
mod traversal;
