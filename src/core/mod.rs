// This module serves as the hub for the pass's shared infrastructure: the error taxonomy,
// the arena-backed lowering session with its statistics, and the lowering configuration
// (target generation, fallback policy, verification). Target-specific code lives under
// bifrost/ and only reaches these through the re-exports below.

//! Core infrastructure shared by the lowering routines.
//!
//! # Key Components
//!
//! ## Session Management (`session`)
//! - Arena allocation of finished sequences using `bumpalo`
//! - Lowering statistics
//!
//! ## Configuration (`config`)
//! - Target generation and the policy for unimplemented strategies
//!
//! ## Errors (`error`)
//! - `thiserror`-based [`LowerError`]

pub mod config;
pub mod error;
pub mod session;

pub use config::{LowerConfig, TargetPolicy};
pub use error::{LowerError, LowerResult};
pub use session::{LowerSession, SessionStats};
