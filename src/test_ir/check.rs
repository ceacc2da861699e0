//! FileCheck-style test validation for test IR files.
//!
//! This module parses RUN and CHECK directives from test IR files, lowers the
//! program once per RUN line and matches the printed sequences against the
//! CHECK patterns, in the manner of LLVM's FileCheck.

use thiserror::Error;

use bumpalo::Bump;

use super::{parse_program, render_lowering_in, ParseError};
use crate::bifrost::arch::{parse_gpu_id, Arch};
use crate::core::{LowerConfig, LowerSession, TargetPolicy};

/// A CHECK directive extracted from a test file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckDirective {
    /// CHECK: pattern - Match pattern on this or a later line
    Check(String),
    /// CHECK-LABEL: pattern - Label for a section
    CheckLabel(String),
    /// CHECK-NEXT: pattern - Match on the next line
    CheckNext(String),
    /// CHECK-EMPTY - Match empty line
    CheckEmpty,
    /// COM: comment - Comment, ignored
    Comment(String),
}

/// A RUN directive specifying how to lower the file
///
/// The arguments are those of the `bilower` driver. A `not` prefix means the
/// driver is expected to exit with an error after printing every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirective {
    pub command: String,
    pub args: Vec<String>,
    pub expect_failure: bool,
}

#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("test has no RUN directive")]
    MissingRun,

    #[error("bad RUN directive `{command}`: {reason}")]
    BadRun { command: String, reason: String },

    #[error("{directive}: {message}")]
    Mismatch {
        directive: &'static str,
        message: String,
    },
}

/// Test specification extracted from a test file
#[derive(Debug)]
pub struct TestSpec {
    pub run_directives: Vec<RunDirective>,
    pub check_directives: Vec<CheckDirective>,
    pub ir_content: String,
}

impl TestSpec {
    /// Split a test file into directives and program text
    pub fn parse(content: &str) -> Self {
        let mut run_directives = Vec::new();
        let mut check_directives = Vec::new();
        let mut ir_lines = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if let Some(run_cmd) = trimmed.strip_prefix("; RUN:") {
                let mut parts: Vec<&str> = run_cmd.split_whitespace().collect();
                let expect_failure = parts.first() == Some(&"not");
                if expect_failure {
                    parts.remove(0);
                }
                if let Some((command, args)) = parts.split_first() {
                    run_directives.push(RunDirective {
                        command: command.to_string(),
                        args: args.iter().map(|s| s.to_string()).collect(),
                        expect_failure,
                    });
                }
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-LABEL:") {
                check_directives.push(CheckDirective::CheckLabel(pattern.trim().to_string()));
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-NEXT:") {
                check_directives.push(CheckDirective::CheckNext(pattern.trim().to_string()));
            } else if trimmed.starts_with("; CHECK-EMPTY") {
                check_directives.push(CheckDirective::CheckEmpty);
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK:") {
                check_directives.push(CheckDirective::Check(pattern.trim().to_string()));
            } else if let Some(comment) = trimmed.strip_prefix("; COM:") {
                check_directives.push(CheckDirective::Comment(comment.trim().to_string()));
            } else {
                ir_lines.push(line);
            }
        }

        TestSpec {
            run_directives,
            check_directives,
            ir_content: ir_lines.join("\n"),
        }
    }
}

/// Test runner that lowers test files and validates the output
#[derive(Debug, Default)]
pub struct TestRunner;

impl TestRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run a test and validate output
    pub fn run_test(&self, spec: &TestSpec) -> Result<(), CheckError> {
        let program = parse_program(&spec.ir_content)?;

        if spec.run_directives.is_empty() {
            return Err(CheckError::MissingRun);
        }

        for run_dir in &spec.run_directives {
            let config = self.config_for(run_dir)?;
            let arena = Bump::new();
            let session = LowerSession::new(&arena);
            let rendering = render_lowering_in(&session, &program, config);
            log::debug!("RUN {} {:?}:\n{}", run_dir.command, run_dir.args, rendering.text);

            let failed = rendering.failures > 0;
            if failed != run_dir.expect_failure {
                return Err(CheckError::Mismatch {
                    directive: "RUN",
                    message: format!(
                        "`{}` {} but {} nodes failed to lower",
                        run_dir.command,
                        if run_dir.expect_failure {
                            "expected to fail"
                        } else {
                            "expected to succeed"
                        },
                        rendering.failures
                    ),
                });
            }
            self.validate_output(&rendering.text, &spec.check_directives)?;
        }

        Ok(())
    }

    /// Translate `bilower` RUN arguments into a lowering configuration
    fn config_for(&self, run_dir: &RunDirective) -> Result<LowerConfig, CheckError> {
        let bad_run = |reason: String| CheckError::BadRun {
            command: run_dir.command.clone(),
            reason,
        };

        let mut config = LowerConfig::default().with_verify(true);
        let mut args = run_dir.args.iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--arch" => {
                    let value = args
                        .next()
                        .ok_or_else(|| bad_run("--arch needs a value".to_string()))?;
                    let major = value
                        .parse::<u32>()
                        .map_err(|e| bad_run(format!("--arch {}: {}", value, e)))?;
                    config.arch = Arch::from_major(major).map_err(|e| bad_run(e.to_string()))?;
                }
                "--gpu-id" => {
                    let value = args
                        .next()
                        .ok_or_else(|| bad_run("--gpu-id needs a value".to_string()))?;
                    let gpu_id = parse_gpu_id(value)
                        .map_err(|e| bad_run(format!("--gpu-id {}: {}", value, e)))?;
                    config.arch = Arch::from_gpu_id(gpu_id).map_err(|e| bad_run(e.to_string()))?;
                }
                "--strict" => config.target_policy = TargetPolicy::Strict,
                // Test runs always verify
                "--verify" => {}
                other => return Err(bad_run(format!("unknown argument `{}`", other))),
            }
        }

        Ok(config)
    }

    /// Validate output against CHECK directives
    pub fn validate_output(
        &self,
        output: &str,
        directives: &[CheckDirective],
    ) -> Result<(), CheckError> {
        let output_lines: Vec<&str> = output.lines().collect();
        let mut line_idx = 0;

        for directive in directives {
            match directive {
                CheckDirective::Comment(_) => continue,

                CheckDirective::Check(pattern) | CheckDirective::CheckLabel(pattern) => {
                    let name = if matches!(directive, CheckDirective::Check(_)) {
                        "CHECK"
                    } else {
                        "CHECK-LABEL"
                    };
                    let found = output_lines
                        .iter()
                        .skip(line_idx)
                        .position(|line| line.contains(pattern.as_str()));

                    match found {
                        Some(idx) => {
                            line_idx += idx + 1;
                            log::trace!("{}: '{}' found at line {}", name, pattern, line_idx - 1);
                        }
                        None => {
                            return Err(CheckError::Mismatch {
                                directive: name,
                                message: format!("pattern '{}' not found in output", pattern),
                            });
                        }
                    }
                }

                CheckDirective::CheckNext(pattern) => {
                    let Some(line) = output_lines.get(line_idx) else {
                        return Err(CheckError::Mismatch {
                            directive: "CHECK-NEXT",
                            message: format!("no more lines, expected '{}'", pattern),
                        });
                    };

                    if !line.contains(pattern.as_str()) {
                        return Err(CheckError::Mismatch {
                            directive: "CHECK-NEXT",
                            message: format!("expected '{}' but got '{}'", pattern, line),
                        });
                    }
                    line_idx += 1;
                }

                CheckDirective::CheckEmpty => {
                    let Some(line) = output_lines.get(line_idx) else {
                        continue; // End of output counts as empty
                    };

                    if !line.trim().is_empty() {
                        return Err(CheckError::Mismatch {
                            directive: "CHECK-EMPTY",
                            message: format!("expected empty line but got '{}'", line),
                        });
                    }
                    line_idx += 1;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directives() {
        let content = r#"; RUN: bilower --arch 7
; CHECK-LABEL: fexp2
; CHECK-NEXT: fma.mscale
; COM: This is a comment
%1:f32 = fexp2 %0"#;

        let spec = TestSpec::parse(content);
        assert_eq!(spec.run_directives.len(), 1);
        assert_eq!(spec.run_directives[0].args, vec!["--arch", "7"]);
        assert_eq!(spec.check_directives.len(), 3);
        assert!(spec.ir_content.contains("fexp2 %0"));
    }

    #[test]
    fn test_check_matching() {
        let runner = TestRunner::new();
        let output = "; %1:f32 = fexp2 %0\n  fma.mscale t0:f32\n  convert t1:i32\n";

        let directives = vec![
            CheckDirective::CheckLabel("fexp2".to_string()),
            CheckDirective::CheckNext("fma.mscale".to_string()),
            CheckDirective::Check("convert".to_string()),
        ];

        runner.validate_output(output, &directives).unwrap();
    }

    #[test]
    fn test_check_next_failure() {
        let runner = TestRunner::new();
        let output = "Line 1\nLine 2\nLine 3\n";

        let directives = vec![
            CheckDirective::Check("Line 1".to_string()),
            CheckDirective::CheckNext("Line 3".to_string()),
        ];

        let err = runner.validate_output(output, &directives).unwrap_err();
        assert!(err.to_string().contains("CHECK-NEXT"));
    }

    #[test]
    fn test_bad_run_argument() {
        let spec = TestSpec::parse("; RUN: bilower --arch 9\n%1:f32 = fexp2 %0");
        let err = TestRunner::new().run_test(&spec).unwrap_err();
        assert!(matches!(err, CheckError::BadRun { .. }));
    }

    #[test]
    fn test_not_prefix_expects_failure() {
        let spec = TestSpec::parse("; RUN: not bilower --arch 6 --strict\n%1:f32 = fexp2 %0");
        assert!(spec.run_directives[0].expect_failure);
        assert_eq!(spec.run_directives[0].command, "bilower");
        TestRunner::new().run_test(&spec).unwrap();

        // Without `not`, a failing node fails the RUN line
        let spec = TestSpec::parse("; RUN: bilower --arch 6 --strict\n%1:f32 = fexp2 %0");
        let err = TestRunner::new().run_test(&spec).unwrap_err();
        assert!(matches!(err, CheckError::Mismatch { directive: "RUN", .. }));

        // ... and a `not` line that lowers cleanly fails too
        let spec = TestSpec::parse("; RUN: not bilower --arch 7\n%1:f32 = fexp2 %0");
        assert!(TestRunner::new().run_test(&spec).is_err());
    }

    #[test]
    fn test_gpu_id_argument() {
        let spec = TestSpec::parse(
            "; RUN: bilower --gpu-id 0x6000\n; CHECK: clper_v6\n%1:f32 = fddx %0",
        );
        TestRunner::new().run_test(&spec).unwrap();
    }

    #[test]
    fn test_missing_run() {
        let spec = TestSpec::parse("%1:f32 = fexp2 %0");
        assert!(matches!(
            TestRunner::new().run_test(&spec),
            Err(CheckError::MissingRun)
        ));
    }
}
