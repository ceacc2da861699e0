//! FileCheck-style tests for test IR files.
//!
//! Each file under tests/filetest carries its own RUN and CHECK directives.

use bifrost_lower::test_ir::{TestRunner, TestSpec};
use std::fs;
use std::path::Path;

/// Test helper that runs a test IR file through FileCheck validation
fn run_filecheck_test(file: &str) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/filetest")
        .join(file);
    let contents = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));

    let spec = TestSpec::parse(&contents);
    TestRunner::new()
        .run_test(&spec)
        .unwrap_or_else(|e| panic!("Test {} failed: {}", file, e));
}

#[test]
fn test_exp2_filecheck() {
    run_filecheck_test("exp2.tir");
}

#[test]
fn test_log2_filecheck() {
    run_filecheck_test("log2.tir");
}

#[test]
fn test_deriv_filecheck() {
    run_filecheck_test("deriv.tir");
}

#[test]
fn test_deriv_v6_filecheck() {
    run_filecheck_test("deriv_v6.tir");
}

#[test]
fn test_strict_v6_filecheck() {
    run_filecheck_test("strict_v6.tir");
}
