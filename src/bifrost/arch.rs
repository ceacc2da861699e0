//! Bifrost architecture revisions.
//!
//! Generation-dependent choices are looked up once through [`Arch::caps`]
//! instead of being tested at each emission site, so adding a generation only
//! means adding a row to the table.

use std::fmt;
use std::num::ParseIntError;

use super::inst::SpecialOp;
use crate::core::{LowerError, LowerResult};

/// Major Bifrost generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    /// First-generation Bifrost (Mali-G71, G72), product ids 0x6xxx.
    V6,
    /// Second-generation Bifrost (Mali-G51, G76, G52, G31), product ids 0x7xxx.
    V7,
}

/// Per-generation lowering capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchCaps {
    /// Lane permute opcode.
    pub clper: SpecialOp,
    /// Whether the FMA_MSCALE + FEXP2_FAST sequence is this generation's own.
    pub native_fexp2: bool,
    /// Whether the FREXP + FLOG2_HELP sequence is this generation's own.
    pub native_flog2: bool,
}

const V6_CAPS: ArchCaps = ArchCaps {
    clper: SpecialOp::ClperV6,
    native_fexp2: false,
    native_flog2: false,
};

const V7_CAPS: ArchCaps = ArchCaps {
    clper: SpecialOp::ClperV7,
    native_fexp2: true,
    native_flog2: true,
};

impl Arch {
    pub const fn caps(self) -> &'static ArchCaps {
        match self {
            Arch::V6 => &V6_CAPS,
            Arch::V7 => &V7_CAPS,
        }
    }

    pub const fn major(self) -> u32 {
        match self {
            Arch::V6 => 6,
            Arch::V7 => 7,
        }
    }

    pub fn from_major(major: u32) -> LowerResult<Self> {
        match major {
            6 => Ok(Arch::V6),
            7 => Ok(Arch::V7),
            _ => Err(LowerError::UnsupportedArch { major }),
        }
    }

    /// Decode the generation from a Mali product id (major in bits 12..16).
    pub fn from_gpu_id(gpu_id: u32) -> LowerResult<Self> {
        Self::from_major((gpu_id >> 12) & 0xf)
            .map_err(|_| LowerError::UnsupportedGpu { gpu_id })
    }
}

/// Parse a Mali product id written in hex (`0x7212`) or decimal.
pub fn parse_gpu_id(text: &str) -> Result<u32, ParseIntError> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bifrost v{}", self.major())
    }
}
