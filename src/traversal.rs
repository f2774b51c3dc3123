//! # Reachability Traversal
//!
//! Implements the explicit worklist-driven visitor that replaces the recursive traversal of
//! `rom_base.py`'s `disassemble`. Using a `VecDeque` instead of recursion keeps stack depth O(1)
//! regardless of basic-block chain length, per the teacher's own preference for bounded,
//! explicit-state loops over deep recursion.

use std::collections::VecDeque;

use tracing::{debug, error, trace};

use crate::addr::Addr;
use crate::disassembler::Disassembler;
use crate::errors::{DisassemblerError, Result};

impl Disassembler {
    /// Walks every reachable instruction starting from `entries` plus any vector destinations,
    /// mutating the classification store in place.
    ///
    /// - `create_labels`: whether newly discovered targets get synthesised labels.
    /// - `single_step`: if true, only the seed addresses themselves are decoded; no successors are
    ///   explored.
    /// - `valid_range`: an optional `(min, max)` window narrowing which addresses may be visited;
    ///   defaults to the full ROM.
    /// - `breakpoints`: addresses the traversal must not decode, even if reachable.
    /// - `vectors`: addresses holding 16-bit code pointers to register and (optionally) label.
    pub fn disassemble(
        &mut self,
        entries: &[Addr],
        create_labels: bool,
        single_step: bool,
        valid_range: Option<(usize, usize)>,
        breakpoints: &[Addr],
        vectors: &[Addr],
    ) -> Result<()> {
        debug!(entries = entries.len(), vectors = vectors.len(), "traversal start");
        let (min, max) = valid_range.unwrap_or((self.base_address, self.max_address));

        let mut vecptrs = Vec::new();
        for vector in vectors {
            let dest = self.set_vector(vector.usize(), None);
            if create_labels {
                self.lookup_address(dest, true, "V_");
            }
            vecptrs.push(Addr::from(dest));
        }

        let mut worklist: VecDeque<Addr> = VecDeque::new();
        worklist.extend(entries.iter().copied());
        worklist.extend(vecptrs);

        while let Some(address) = worklist.pop_front() {
            trace!(address = address.usize(), "worklist pop");
            if address.usize() < min || address.usize() > max || breakpoints.contains(&address) {
                continue;
            }
            if !self.in_range(address.usize()) {
                error!(address = address.usize(), "entry outside ROM bounds");
                return Err(DisassemblerError::EntryOutOfRange(address));
            }
            let successors = self.disasm_single(address, create_labels);
            if !single_step {
                worklist.extend(successors);
            }
        }

        debug!("traversal finish");
        Ok(())
    }
}
