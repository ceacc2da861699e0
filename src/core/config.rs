//! Lowering configuration.
//!
//! [`LowerConfig`] carries the per-compile knobs of the pass: the target
//! generation, what to do when a generation has no native exp2/log2 strategy,
//! and whether every emitted sequence is run through the verifier.

use crate::bifrost::arch::Arch;

/// Behaviour when exp2/log2 is requested for a generation without a native
/// lowering strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetPolicy {
    /// Emit the newer generation's sequence and log a warning.
    #[default]
    Fallback,
    /// Refuse with [`LowerError::UnsupportedTarget`](crate::core::LowerError).
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowerConfig {
    pub arch: Arch,
    pub target_policy: TargetPolicy,
    pub verify: bool,
}

impl LowerConfig {
    pub fn new(arch: Arch) -> Self {
        Self {
            arch,
            ..Self::default()
        }
    }

    pub fn with_target_policy(mut self, policy: TargetPolicy) -> Self {
        self.target_policy = policy;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

impl Default for LowerConfig {
    fn default() -> Self {
        Self {
            arch: Arch::V7,
            target_policy: TargetPolicy::Fallback,
            verify: cfg!(debug_assertions),
        }
    }
}
