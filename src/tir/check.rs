//! FileCheck-style test validation for TIR files.
//!
//! A test file carries `; RUN:` lines naming the reports to print and
//! `; CHECK` lines the output must match, next to the TIR it exercises.
//! Both are `;` comments, so the TIR parser skips them.

use crate::core::{CompilationSession, PrintOptions};

use super::Program;

/// A CHECK directive extracted from a TIR file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckDirective {
    /// CHECK: pattern - Match on this or any later line
    Check(String),
    /// CHECK-LABEL: pattern - Start of a section
    CheckLabel(String),
    /// CHECK-NEXT: pattern - Match on the next line
    CheckNext(String),
    /// CHECK-NOT: pattern - Must not appear before the next match
    CheckNot(String),
    /// CHECK-EMPTY - Match empty line
    CheckEmpty,
    /// COM: comment - Comment, ignored
    Comment(String),
}

/// A RUN directive: a tool name followed by its flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirective {
    pub command: String,
    pub args: Vec<String>,
}

/// Test specification extracted from a TIR file
#[derive(Debug)]
pub struct TestSpec {
    pub run_directives: Vec<RunDirective>,
    pub check_directives: Vec<CheckDirective>,
    pub tir_content: String,
}

fn directive<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix).map(str::trim)
}

impl TestSpec {
    /// Split a TIR file into directives and TIR text.
    pub fn parse(content: &str) -> Self {
        let mut run_directives = Vec::new();
        let mut check_directives = Vec::new();
        let mut tir_lines = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if let Some(run_cmd) = directive(trimmed, "; RUN:") {
                let mut parts = run_cmd.split_whitespace().map(str::to_string);
                if let Some(command) = parts.next() {
                    run_directives.push(RunDirective {
                        command,
                        args: parts.collect(),
                    });
                }
            } else if let Some(pattern) = directive(trimmed, "; CHECK-LABEL:") {
                check_directives.push(CheckDirective::CheckLabel(pattern.to_string()));
            } else if let Some(pattern) = directive(trimmed, "; CHECK-NEXT:") {
                check_directives.push(CheckDirective::CheckNext(pattern.to_string()));
            } else if let Some(pattern) = directive(trimmed, "; CHECK-NOT:") {
                check_directives.push(CheckDirective::CheckNot(pattern.to_string()));
            } else if trimmed.starts_with("; CHECK-EMPTY") {
                check_directives.push(CheckDirective::CheckEmpty);
            } else if let Some(pattern) = directive(trimmed, "; CHECK:") {
                check_directives.push(CheckDirective::Check(pattern.to_string()));
            } else if let Some(comment) = directive(trimmed, "; COM:") {
                check_directives.push(CheckDirective::Comment(comment.to_string()));
            } else {
                tir_lines.push(line);
            }
        }

        TestSpec {
            run_directives,
            check_directives,
            tir_content: tir_lines.join("\n"),
        }
    }
}

/// Test runner that executes TIR tests
pub struct TestRunner {
    verbose: bool,
}

impl TestRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Run every RUN line of `spec` and validate its output.
    pub fn run_test(&self, spec: &TestSpec) -> Result<(), String> {
        let program = Program::parse(&spec.tir_content).map_err(|e| e.to_string())?;

        if spec.run_directives.is_empty() {
            return Err("no RUN directive".to_string());
        }

        for run_dir in &spec.run_directives {
            let output = self.execute_command(&program, run_dir)?;
            if self.verbose {
                println!("{}", output);
            }
            self.validate_output(&output, &spec.check_directives)?;
        }

        Ok(())
    }

    /// Execute a RUN line and return what it prints.
    pub fn execute_command(
        &self,
        program: &Program,
        run_dir: &RunDirective,
    ) -> Result<String, String> {
        let mut print = PrintOptions::default();
        let mut only = None;

        let mut args = run_dir.args.iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--print-ir" => print.ir = true,
                "--print-cfg" => print.cfg = true,
                "--print-liveness" => print.liveness = true,
                "--print-trace" => print.trace = true,
                "--print-linear" => print.linear = true,
                "--print-dead" => print.dead = true,
                "--func" => only = args.next().map(String::as_str),
                _ => {}
            }
        }

        let mut session = CompilationSession::new(print.pipeline());
        let bodies = session
            .compile_program(program, only)
            .map_err(|e| e.to_string())?;

        let output: Vec<String> = bodies.iter().map(|body| body.render(&print)).collect();
        Ok(output.join("\n"))
    }

    /// Validate output against CHECK directives
    pub fn validate_output(
        &self,
        output: &str,
        directives: &[CheckDirective],
    ) -> Result<(), String> {
        let output_lines: Vec<&str> = output.lines().collect();
        let mut line_idx = 0;
        let mut pending_not: Vec<&str> = Vec::new();

        for directive in directives {
            match directive {
                CheckDirective::Comment(_) => continue,

                CheckDirective::CheckNot(pattern) => pending_not.push(pattern.as_str()),

                CheckDirective::Check(pattern) | CheckDirective::CheckLabel(pattern) => {
                    let found = output_lines
                        .iter()
                        .skip(line_idx)
                        .position(|line| line.contains(pattern.as_str()));

                    match found {
                        Some(idx) => {
                            check_not(&pending_not, &output_lines[line_idx..line_idx + idx])?;
                            pending_not.clear();
                            line_idx += idx + 1;
                            if self.verbose {
                                println!("CHECK: '{}' found at line {}", pattern, line_idx - 1);
                            }
                        }
                        None => {
                            return Err(format!(
                                "CHECK: pattern '{}' not found in output",
                                pattern
                            ));
                        }
                    }
                }

                CheckDirective::CheckNext(pattern) => {
                    let Some(line) = output_lines.get(line_idx) else {
                        return Err(format!("CHECK-NEXT: no more lines, expected '{}'", pattern));
                    };

                    if !line.contains(pattern.as_str()) {
                        return Err(format!(
                            "CHECK-NEXT: expected '{}' but got '{}'",
                            pattern, line
                        ));
                    }

                    if self.verbose {
                        println!("CHECK-NEXT: '{}' matches at line {}", pattern, line_idx);
                    }
                    line_idx += 1;
                }

                CheckDirective::CheckEmpty => {
                    // End of output counts as empty
                    let Some(line) = output_lines.get(line_idx) else {
                        continue;
                    };

                    if !line.trim().is_empty() {
                        return Err(format!(
                            "CHECK-EMPTY: expected empty line but got '{}'",
                            line
                        ));
                    }
                    line_idx += 1;
                }
            }
        }

        check_not(&pending_not, output_lines.get(line_idx..).unwrap_or_default())
    }
}

fn check_not(patterns: &[&str], lines: &[&str]) -> Result<(), String> {
    for pattern in patterns {
        if let Some(line) = lines.iter().find(|line| line.contains(pattern)) {
            return Err(format!("CHECK-NOT: '{}' found in '{}'", pattern, line));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directives() {
        let content = r#"; RUN: tirflow --print-cfg %s
; CHECK-LABEL: CFG for test
; CHECK-NEXT: CFG has 1 nodes
; CHECK: Successors:
; COM: This is a comment
func test {
    (return)
}"#;

        let spec = TestSpec::parse(content);
        assert_eq!(spec.run_directives.len(), 1);
        assert_eq!(spec.run_directives[0].command, "tirflow");
        assert_eq!(spec.run_directives[0].args, vec!["--print-cfg", "%s"]);
        assert_eq!(spec.check_directives.len(), 4);
        assert!(spec.tir_content.contains("func test"));
    }

    #[test]
    fn test_check_matching() {
        let runner = TestRunner::new(false);
        let output = "CFG for f\nCFG has 1 nodes\nNode 0\n";

        let directives = vec![
            CheckDirective::CheckLabel("CFG for f".to_string()),
            CheckDirective::CheckNext("CFG has 1 nodes".to_string()),
            CheckDirective::Check("Node 0".to_string()),
        ];

        runner.validate_output(output, &directives).unwrap();
    }

    #[test]
    fn test_check_next_failure() {
        let runner = TestRunner::new(false);
        let output = "Line 1\nLine 2\nLine 3\n";

        let directives = vec![
            CheckDirective::Check("Line 1".to_string()),
            CheckDirective::CheckNext("Line 3".to_string()),
        ];

        let result = runner.validate_output(output, &directives);
        assert!(result.unwrap_err().contains("CHECK-NEXT"));
    }

    #[test]
    fn test_check_not() {
        let runner = TestRunner::new(false);
        let output = "Trace 0: 0 1\nOrder: 0 1\n";

        let ok = vec![
            CheckDirective::CheckNot("Trace 1".to_string()),
            CheckDirective::Check("Order: 0 1".to_string()),
        ];
        runner.validate_output(output, &ok).unwrap();

        let bad = vec![
            CheckDirective::CheckNot("Trace 0".to_string()),
            CheckDirective::Check("Order".to_string()),
        ];
        assert!(runner.validate_output(output, &bad).is_err());
    }

    #[test]
    fn test_run_cfg_report() {
        let spec = TestSpec::parse(
            r#"; RUN: tirflow --print-cfg --func f %s
; CHECK-LABEL: CFG for f
; CHECK-NEXT: CFG has 2 nodes
; CHECK-NEXT: Node 0
; CHECK-NEXT: Is a branch node? false
; CHECK-NEXT: Predecessors:
; CHECK-NEXT: Successors: 1
; CHECK-NOT: CFG for g
func f {
    (move (temp x) (const 1))
    (label L1)
    (return (temp x))
}

func g {
    (return)
}"#,
        );

        TestRunner::new(false).run_test(&spec).unwrap();
    }
}
