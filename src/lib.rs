//! Bifrost special-function lowering.
//!
//! Mali Bifrost GPUs have no single instruction for `exp2`, `log2` or the
//! screen-space derivatives. This crate lowers those high-level ALU nodes to
//! short sequences of the primitives the hardware does provide: frexp range
//! reduction, approximation tables, lane permutes and fused multiply-add.
//!
//! # Primary Usage
//!
//! ```
//! use bifrost_lower::bifrost::{Arch, BiContext};
//! use bifrost_lower::core::{LowerConfig, LowerSession};
//! use bifrost_lower::ir::{AluInstr, AluOp, AluSrc};
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let session = LowerSession::new(&arena);
//! let mut ctx = BiContext::new(&session, LowerConfig::new(Arch::V7));
//!
//! let exp2 = AluInstr::new(AluOp::Fexp2, AluSrc::new(0), 5, 32);
//! let seq = ctx.lower(&exp2)?;
//! assert_eq!(seq.len(), 3);
//! # Ok::<(), bifrost_lower::core::LowerError>(())
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Shared infrastructure (session, config, errors)
//! - [`ir`] - High-level ALU nodes consumed by the pass
//! - [`bifrost`] - Target data model and the lowering routines
//! - [`test_ir`] - Textual node format and FileCheck-style test runner

pub mod bifrost;
pub mod core;
pub mod ir;
pub mod test_ir;

pub use crate::bifrost::{Arch, BiContext, EmitContext, Inst};
pub use crate::core::{LowerConfig, LowerError, LowerResult, LowerSession, SessionStats, TargetPolicy};
pub use crate::ir::{AluInstr, AluOp, AluSrc};
