// This module defines the narrow emission interface the special-function routines are
// written against, and BiContext, its concrete implementation. EmitContext exposes exactly
// what a routine needs from the surrounding compiler: the target generation, the policy for
// generations without a native strategy, fresh temporaries and an append-only emit. BiContext
// owns a monotonically increasing temporary counter and an arena-backed emission sink that
// keeps instructions in program order across every node lowered through it; temporaries are
// never handed out twice, so sequences of different nodes cannot alias. After each node it
// optionally runs the sequence verifier and only then records the node's statistics in the
// session, so a rejected sequence leaves no trace in the counters. Emitted instructions are
// traced through the log facade as they arrive.

//! Emission interface and the Bifrost lowering context.

use bumpalo::collections::Vec as BumpVec;

use super::arch::Arch;
use super::inst::{Inst, Reg};
use super::special;
use super::verify::verify_sequence;
use crate::core::{LowerConfig, LowerResult, LowerSession, TargetPolicy};
use crate::ir::{AluInstr, AluOp};

/// What the lowering routines need from the compiler driving them.
pub trait EmitContext {
    /// Target generation.
    fn arch(&self) -> Arch;

    /// Behaviour for generations without a native exp2/log2 strategy.
    fn target_policy(&self) -> TargetPolicy {
        TargetPolicy::Fallback
    }

    /// Allocate a fresh temporary.
    fn make_temp(&mut self) -> Reg;

    /// Append an instruction to the sink.
    fn emit(&mut self, inst: Inst);

    /// Called when `op` is lowered with another generation's strategy.
    fn note_fallback(&mut self, _op: AluOp) {}
}

/// Lowering context for one compile.
pub struct BiContext<'s, 'arena> {
    session: &'s LowerSession<'arena>,
    config: LowerConfig,
    temp_alloc: u32,
    sink: BumpVec<'arena, Inst>,
    /// Fallback taken by the node being lowered, reported once it is accepted.
    pending_fallback: Option<AluOp>,
}

impl<'s, 'arena> BiContext<'s, 'arena> {
    pub fn new(session: &'s LowerSession<'arena>, config: LowerConfig) -> Self {
        Self {
            session,
            config,
            temp_alloc: 0,
            sink: BumpVec::new_in(session.arena()),
            pending_fallback: None,
        }
    }

    /// Everything emitted so far, in program order.
    pub fn instructions(&self) -> &[Inst] {
        &self.sink
    }

    /// Number of temporaries handed out so far.
    pub fn temp_count(&self) -> u32 {
        self.temp_alloc
    }

    /// Lower one node and return the instructions emitted for it.
    pub fn lower(&mut self, instr: &AluInstr) -> LowerResult<&[Inst]> {
        let start = self.sink.len();
        let temps_start = self.temp_alloc;
        self.pending_fallback = None;
        special::lower_alu(self, instr)?;

        if self.config.verify {
            if let Err(err) = verify_sequence(&self.sink[start..], instr) {
                self.sink.truncate(start);
                self.pending_fallback = None;
                return Err(err.into());
            }
        }

        self.session.record_node_lowered();
        self.session
            .record_temps_allocated((self.temp_alloc - temps_start) as usize);
        for inst in &self.sink[start..] {
            self.session.record_instruction_emitted(inst);
        }
        if let Some(op) = self.pending_fallback.take() {
            self.report_fallback(op);
        }
        log::debug!(
            "Lowered `{}` to {} instructions",
            instr,
            self.sink.len() - start
        );
        Ok(&self.sink[start..])
    }

    /// Lower a list of nodes in order.
    pub fn lower_block(&mut self, instrs: &[AluInstr]) -> LowerResult<()> {
        for instr in instrs {
            self.lower(instr)?;
        }
        Ok(())
    }

    fn report_fallback(&self, op: AluOp) {
        let arch = self.config.arch;
        if self.session.record_fallback(op, arch) {
            log::warn!(
                "{} has no native {} lowering yet; using the {} sequence",
                arch,
                op,
                Arch::V7
            );
        }
    }

    /// Hand the finished sequence over to later passes.
    pub fn finish(self) -> &'arena [Inst] {
        self.sink.into_bump_slice()
    }
}

impl EmitContext for BiContext<'_, '_> {
    fn arch(&self) -> Arch {
        self.config.arch
    }

    fn target_policy(&self) -> TargetPolicy {
        self.config.target_policy
    }

    fn make_temp(&mut self) -> Reg {
        let reg = Reg::Temp(self.temp_alloc);
        self.temp_alloc += 1;
        reg
    }

    fn emit(&mut self, inst: Inst) {
        log::trace!("emit {}", inst);
        self.sink.push(inst);
    }

    fn note_fallback(&mut self, op: AluOp) {
        self.pending_fallback = Some(op);
    }
}
