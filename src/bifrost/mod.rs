// This module is the Bifrost target of the lowering pass. It holds the architecture
// revision table, the machine instruction descriptor the routines build, the emission
// interface and its concrete context, the special-function routines themselves and the
// verifier for their output. The layout mirrors a backend directory: data model first
// (arch, inst), then the plumbing (context), then the lowering logic (special, verify).

//! Bifrost target.
//!
//! - [`arch`] - generation table and capability lookup
//! - [`inst`] - instruction descriptors and their textual form
//! - [`context`] - [`EmitContext`] and [`BiContext`]
//! - [`special`] - exp2, log2 and derivative lowering
//! - [`verify`] - dataflow checks on lowered sequences

pub mod arch;
pub mod context;
pub mod inst;
pub mod special;
pub mod verify;

pub use arch::{parse_gpu_id, Arch, ArchCaps};
pub use context::{BiContext, EmitContext};
pub use inst::{AluType, Constant, Index, Inst, InstClass, Reg, Swizzle};
pub use special::{emit_deriv, emit_fexp2, emit_flog2, lower_alu, DerivDirection};
pub use verify::{verify_sequence, VerifyError};
