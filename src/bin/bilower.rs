//! Special-function lowering driver.
//!
//! Reads test IR from a file or stdin, lowers every node for the selected
//! Bifrost generation and prints the resulting instructions. A node that fails
//! to lower prints an `error:` line and lowering continues; the driver exits
//! with status 1 once every node has been printed.

use bifrost_lower::bifrost::{parse_gpu_id, Arch};
use bifrost_lower::core::{LowerConfig, LowerSession, TargetPolicy};
use bifrost_lower::test_ir::{parse_program, render_lowering_in};
use bumpalo::Bump;
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "bilower", about = "Lower exp2, log2 and derivatives to Bifrost instructions")]
struct Cli {
    /// Test IR file; stdin when omitted
    input: Option<PathBuf>,

    /// Bifrost major generation (6 or 7)
    #[arg(long, conflicts_with = "gpu_id")]
    arch: Option<u32>,

    /// Mali product id, e.g. 0x7212
    #[arg(long, value_parser = parse_gpu_id)]
    gpu_id: Option<u32>,

    /// Refuse exp2/log2 on generations without a native sequence
    #[arg(long)]
    strict: bool,

    /// Verify every lowered sequence
    #[arg(long)]
    verify: bool,

    /// Print lowering statistics to stderr
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let arch = match (cli.arch, cli.gpu_id) {
        (Some(major), _) => Arch::from_major(major)?,
        (None, Some(gpu_id)) => Arch::from_gpu_id(gpu_id)?,
        (None, None) => Arch::V7,
    };
    let policy = if cli.strict {
        TargetPolicy::Strict
    } else {
        TargetPolicy::Fallback
    };
    let config = LowerConfig::new(arch)
        .with_target_policy(policy)
        .with_verify(cli.verify || cfg!(debug_assertions));

    let ir_text = match &cli.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let program = parse_program(&ir_text)?;

    let arena = Bump::new();
    let session = LowerSession::new(&arena);
    let rendering = render_lowering_in(&session, &program, config);
    println!("{}", rendering.text);

    if cli.stats {
        eprint!("{}", session.stats());
    }

    if rendering.failures > 0 {
        log::error!("{} of {} nodes failed to lower", rendering.failures, program.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
