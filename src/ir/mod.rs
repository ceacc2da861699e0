//! High-level ALU nodes handed to the lowering pass.
//!
//! This is the narrow slice of the upstream IR the special-function routines
//! look at: the op kind, one source (SSA value plus component swizzle), the
//! destination SSA value and the declared destination bit size.

use std::fmt;

/// Operation kind of a high-level ALU node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    Fexp2,
    Flog2,
    Fddx,
    Fddy,
    Fsin,
    Fcos,
    Frsq,
}

impl AluOp {
    pub fn name(self) -> &'static str {
        match self {
            AluOp::Fexp2 => "fexp2",
            AluOp::Flog2 => "flog2",
            AluOp::Fddx => "fddx",
            AluOp::Fddy => "fddy",
            AluOp::Fsin => "fsin",
            AluOp::Fcos => "fcos",
            AluOp::Frsq => "frsq",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "fexp2" => AluOp::Fexp2,
            "flog2" => AluOp::Flog2,
            "fddx" => AluOp::Fddx,
            "fddy" => AluOp::Fddy,
            "fsin" => AluOp::Fsin,
            "fcos" => AluOp::Fcos,
            "frsq" => AluOp::Frsq,
            _ => return None,
        })
    }
}

impl fmt::Display for AluOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source operand of an ALU node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluSrc {
    /// SSA value read by the node.
    pub value: u32,
    /// Component read for each channel of the node.
    pub swizzle: [u8; 4],
}

impl AluSrc {
    pub fn new(value: u32) -> Self {
        Self {
            value,
            swizzle: [0, 1, 2, 3],
        }
    }

    /// Source reading `component` of `value` in the first channel.
    pub fn with_component(value: u32, component: u8) -> Self {
        let mut src = Self::new(value);
        src.swizzle[0] = component;
        src
    }
}

/// A single-source ALU node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluInstr {
    pub op: AluOp,
    pub src: AluSrc,
    pub dest: u32,
    pub dest_bit_size: u32,
}

impl AluInstr {
    pub fn new(op: AluOp, src: AluSrc, dest: u32, dest_bit_size: u32) -> Self {
        Self {
            op,
            src,
            dest,
            dest_bit_size,
        }
    }
}

const COMPONENTS: [char; 4] = ['x', 'y', 'z', 'w'];

impl fmt::Display for AluInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "%{}:f{} = {} %{}",
            self.dest, self.dest_bit_size, self.op, self.src.value
        )?;
        match COMPONENTS.get(self.src.swizzle[0] as usize).copied() {
            Some('x') => Ok(()),
            Some(c) => write!(f, ".{}", c),
            None => write!(f, ".c{}", self.src.swizzle[0]),
        }
    }
}
