//! Run the bilower driver on the test IR files.
//!
//! The FileCheck tests lower in process; these run the actual binary with each
//! file's RUN arguments and hold its stdout and exit status to the same CHECK
//! lines.

use bifrost_lower::test_ir::{TestRunner, TestSpec};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn filetest_path(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/filetest")
        .join(file)
}

fn run_bilower(args: &[String], input: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bilower"))
        .args(args)
        .arg(input)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run bilower: {}", e))
}

/// Run every RUN line of `file` through the binary and check its output
fn run_bilower_test(file: &str) {
    let path = filetest_path(file);
    let contents = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    let spec = TestSpec::parse(&contents);
    assert!(!spec.run_directives.is_empty(), "{} has no RUN line", file);

    for run_dir in &spec.run_directives {
        assert_eq!(run_dir.command, "bilower");
        let output = run_bilower(&run_dir.args, &path);
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert_eq!(
            output.status.success(),
            !run_dir.expect_failure,
            "{} {:?}: unexpected exit status {}\nstderr:\n{}",
            file,
            run_dir.args,
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
        TestRunner::new()
            .validate_output(&stdout, &spec.check_directives)
            .unwrap_or_else(|e| panic!("{} {:?} failed: {}\n{}", file, run_dir.args, e, stdout));
    }
}

#[test]
fn test_bilower_exp2() {
    run_bilower_test("exp2.tir");
}

#[test]
fn test_bilower_log2() {
    run_bilower_test("log2.tir");
}

#[test]
fn test_bilower_deriv() {
    run_bilower_test("deriv.tir");
}

#[test]
fn test_bilower_deriv_v6() {
    run_bilower_test("deriv_v6.tir");
}

#[test]
fn test_bilower_strict_prints_every_node() {
    run_bilower_test("strict_v6.tir");

    let args = ["--arch", "6", "--strict"].map(String::from);
    let output = run_bilower(&args, &filetest_path("strict_v6.tir"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("error:").count(), 3, "{}", stdout);
    assert!(stdout.contains("; %3:f32 = fsin %0"));
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_bilower_stats_from_same_session() {
    let args = ["--gpu-id", "0x7212", "--stats"].map(String::from);
    let output = run_bilower(&args, &filetest_path("deriv.tir"));
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Nodes lowered: 2"), "{}", stderr);
    assert!(stderr.contains("Instructions emitted: 12"), "{}", stderr);
    assert!(stderr.contains("Temporaries allocated: 10"), "{}", stderr);
}
