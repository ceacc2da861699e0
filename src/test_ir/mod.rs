//! Test IR for exercising the lowering pass without a full compiler.
//!
//! One ALU node per line, `;` starts a comment:
//!
//! ```text
//! ; exp2 of the first component of %0 into %5
//! %5:f32 = fexp2 %0
//! %6:f16 = fddy %1.y
//! ```
//!
//! The type suffix of the destination gives its declared bit size. Files may
//! carry FileCheck directives, see [`check`].

use bumpalo::Bump;

use crate::bifrost::context::BiContext;
use crate::core::{LowerConfig, LowerSession};
use crate::ir::AluInstr;

pub mod check;
pub mod parser;

pub use check::{CheckDirective, CheckError, RunDirective, TestRunner, TestSpec};
pub use parser::{parse_program, ParseError};

/// Printed lowering of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendering {
    pub text: String,
    /// Nodes that failed to lower.
    pub failures: usize,
}

/// Lower `program` and print each node followed by its instructions.
///
/// A node that fails to lower prints an `error:` line instead, and lowering
/// continues with the next node.
pub fn render_lowering(program: &[AluInstr], config: LowerConfig) -> String {
    let arena = Bump::new();
    let session = LowerSession::new(&arena);
    render_lowering_in(&session, program, config).text
}

/// [`render_lowering`] within an existing session, so its statistics can be
/// reported afterwards.
pub fn render_lowering_in(
    session: &LowerSession<'_>,
    program: &[AluInstr],
    config: LowerConfig,
) -> Rendering {
    let mut ctx = BiContext::new(session, config);

    let mut lines = Vec::new();
    let mut failures = 0;
    for instr in program {
        lines.push(format!("; {}", instr));
        match ctx.lower(instr) {
            Ok(seq) => lines.extend(seq.iter().map(|inst| format!("  {}", inst))),
            Err(e) => {
                failures += 1;
                lines.push(format!("  error: {}", e));
            }
        }
    }

    Rendering {
        text: lines.join("\n"),
        failures,
    }
}
