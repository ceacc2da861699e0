// This module provides arena-based lowering session management using the bumpalo crate.
// LowerSession owns a reference to the arena that backs every emission sink created during
// a compile, so lowered sequences can be handed to later passes without copying. It also
// tracks the statistics of the pass: nodes lowered, instructions emitted per opcode class,
// temporaries allocated, and how many times an exp2/log2 request fell back to the newer
// generation's strategy. Fallback warnings are de-duplicated per (op, arch) pair so a
// shader with hundreds of exp2 nodes logs the gap once. SessionStats renders as a report
// for the bilower --stats flag.

//! Arena-based lowering session.
//!
//! All emission sinks of a compile share the session's arena lifetime.

use bumpalo::Bump;
use hashbrown::{HashMap, HashSet};
use std::cell::RefCell;
use std::fmt;

use crate::bifrost::arch::Arch;
use crate::bifrost::inst::Inst;
use crate::ir::AluOp;

/// Arena-based lowering session.
pub struct LowerSession<'arena> {
    /// Arena allocator backing emission sinks.
    arena: &'arena Bump,

    /// Session statistics.
    stats: RefCell<SessionStats>,

    /// (op, arch) pairs whose fallback has already been reported.
    reported_fallbacks: RefCell<HashSet<(AluOp, Arch)>>,
}

impl<'arena> LowerSession<'arena> {
    /// Create a new lowering session with the given arena.
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stats: RefCell::new(SessionStats::default()),
            reported_fallbacks: RefCell::new(HashSet::new()),
        }
    }

    /// Get access to the arena allocator.
    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Record that a high-level node was lowered.
    pub fn record_node_lowered(&self) {
        self.stats.borrow_mut().nodes_lowered += 1;
    }

    /// Record an emitted instruction.
    pub fn record_instruction_emitted(&self, inst: &Inst) {
        let mut stats = self.stats.borrow_mut();
        stats.instructions_emitted += 1;
        *stats.instruction_counts.entry(inst.class.name()).or_insert(0) += 1;
    }

    /// Record temporaries handed out for a lowered node.
    pub fn record_temps_allocated(&self, count: usize) {
        self.stats.borrow_mut().temps_allocated += count;
    }

    /// Record a fallback to the newer generation's strategy.
    ///
    /// Returns `true` the first time a given (op, arch) pair falls back.
    pub fn record_fallback(&self, op: AluOp, arch: Arch) -> bool {
        self.stats.borrow_mut().fallbacks_taken += 1;
        self.reported_fallbacks.borrow_mut().insert((op, arch))
    }

    /// Get lowering statistics.
    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }
}

/// Lowering session statistics.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    /// Number of high-level nodes lowered.
    pub nodes_lowered: usize,

    /// Number of machine instructions emitted.
    pub instructions_emitted: usize,

    /// Count of each instruction class emitted.
    pub instruction_counts: HashMap<&'static str, usize>,

    /// Temporaries handed out.
    pub temps_allocated: usize,

    /// exp2/log2 nodes lowered with another generation's strategy.
    pub fallbacks_taken: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lowering Session Statistics:")?;
        writeln!(f, "  Nodes lowered: {}", self.nodes_lowered)?;
        writeln!(f, "  Instructions emitted: {}", self.instructions_emitted)?;
        writeln!(f, "  Temporaries allocated: {}", self.temps_allocated)?;
        writeln!(f, "  Fallbacks taken: {}", self.fallbacks_taken)?;

        if !self.instruction_counts.is_empty() {
            writeln!(f, "  Instruction breakdown:")?;
            let mut sorted: Vec<_> = self.instruction_counts.iter().collect();
            sorted.sort_by(|(a_name, a_count), (b_name, b_count)| {
                b_count.cmp(a_count).then(a_name.cmp(b_name))
            });

            for (class, count) in sorted {
                writeln!(f, "    {}: {}", class, count)?;
            }
        }

        Ok(())
    }
}
