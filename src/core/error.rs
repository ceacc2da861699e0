// This module defines error types for the lowering pass using the thiserror crate for
// idiomatic Rust error handling. LowerError is the main error enum: unsupported target
// generations under the strict policy, ALU ops the special-function lowering does not
// handle, derivative destinations of an unsupported width, unknown GPU products, and
// sequence validation failures when verification is enabled. Each variant carries the
// context needed to report the failing node. The module also provides LowerResult<T> as
// a convenience alias for Result<T, LowerError>.

//! Error types for the lowering pass.

use thiserror::Error;

use crate::bifrost::arch::Arch;
use crate::bifrost::verify::VerifyError;
use crate::ir::AluOp;

/// Main error type for special-function lowering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LowerError {
    #[error("{op} lowering is not implemented for {arch}")]
    UnsupportedTarget { op: AluOp, arch: Arch },

    #[error("{op} is not lowered by the special-function pass")]
    UnsupportedOp { op: AluOp },

    #[error("Unsupported {bits}-bit destination for {op}")]
    InvalidBitSize { op: AluOp, bits: u32 },

    #[error("Unsupported GPU id {gpu_id:#x}")]
    UnsupportedGpu { gpu_id: u32 },

    #[error("Unsupported architecture major version {major}")]
    UnsupportedArch { major: u32 },

    #[error("Invalid lowered sequence: {0}")]
    Verify(#[from] VerifyError),
}

/// Result type alias for lowering operations.
pub type LowerResult<T> = Result<T, LowerError>;
