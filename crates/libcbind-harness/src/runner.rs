//! Test execution engine.

use std::ffi::CString;
use std::io::Write;
use std::time::Instant;

use libcbind_abi::{check_mode, cstr_len};

use crate::diff;
use crate::error::HarnessError;
use crate::fixtures::{ConcurrentInputs, FixtureCase, FixtureSet, PrintfInputs, StrlenInputs};
use crate::probe::{Probe, ProbeOutput};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
use crate::verify::VerificationResult;

/// What a case produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub output: String,
    pub rc: Option<i64>,
    /// Probe exit status; `None` for in-process cases.
    pub exit_code: Option<i32>,
    /// The checked layer refused the call.
    pub refused: bool,
}

impl Execution {
    fn from_probe(out: ProbeOutput, output: String) -> Self {
        Self {
            refused: out.was_refused(),
            output,
            rc: out.rc,
            exit_code: out.exit_code,
        }
    }
}

/// Runs a fixture set and collects verification results.
pub struct TestRunner {
    /// Name of the test campaign.
    pub campaign: String,
    probe: Option<Probe>,
}

impl TestRunner {
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            probe: None,
        }
    }

    /// Use `probe` for cases that must observe stdout.
    #[must_use]
    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Run all fixtures in a set and return results.
    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        fixture_set.cases.iter().map(|case| self.run_case(case)).collect()
    }

    /// Run all fixtures, emitting one log record per case.
    pub fn run_logged<W: Write>(
        &self,
        fixture_set: &FixtureSet,
        emitter: &mut LogEmitter<W>,
    ) -> std::io::Result<Vec<VerificationResult>> {
        let mode = check_mode().as_str();
        let mut results = Vec::with_capacity(fixture_set.cases.len());
        for case in &fixture_set.cases {
            let result = self.run_case(case);
            let outcome = if result.error.is_some() {
                Outcome::Error
            } else if result.passed {
                Outcome::Pass
            } else {
                Outcome::Fail
            };
            let level = if result.passed {
                LogLevel::Info
            } else {
                LogLevel::Error
            };
            let mut entry = LogEntry::new(String::new(), level, "case_result")
                .with_symbol(native_symbol(&case.function))
                .with_mode(mode)
                .with_outcome(outcome)
                .with_latency_ns(result.latency_ns);
            if let Some(rc) = result.actual_return {
                entry = entry.with_rc(rc);
            }
            if let Some(code) = result.exit_code {
                entry = entry.with_exit_code(code);
            }
            let mut details = serde_json::json!({
                "case": result.case_name,
                "spec_section": result.spec_section,
            });
            if let Some(diff) = &result.diff {
                details["diff"] = serde_json::Value::String(diff.clone());
            }
            if let Some(error) = &result.error {
                details["error"] = serde_json::Value::String(error.clone());
            }
            emitter.emit_entry(entry.with_details(details))?;
            results.push(result);
        }
        Ok(results)
    }

    fn run_case(&self, case: &FixtureCase) -> VerificationResult {
        let started = Instant::now();
        let execution = self.execute(case);
        let latency_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);

        match execution {
            Ok(run) => {
                let output_ok = run.output == case.expected_output;
                let rc_ok = case.expected_return.is_none() || case.expected_return == run.rc;
                let exit_ok = if case.expect_refused {
                    run.refused
                } else {
                    !run.refused && run.exit_code.unwrap_or(0) == 0
                };
                let diff = if !exit_ok {
                    Some(format!(
                        "exit mismatch: expected {}, got status {:?}",
                        if case.expect_refused {
                            "a refused call"
                        } else {
                            "a clean exit"
                        },
                        run.exit_code
                    ))
                } else if !output_ok {
                    Some(diff::render_diff(&case.expected_output, &run.output))
                } else if !rc_ok {
                    Some(format!(
                        "return mismatch: expected {:?}, got {:?}",
                        case.expected_return, run.rc
                    ))
                } else {
                    None
                };
                VerificationResult {
                    case_name: case.name.clone(),
                    function: case.function.clone(),
                    spec_section: case.spec_section.clone(),
                    passed: exit_ok && output_ok && rc_ok,
                    expected: case.expected_output.clone(),
                    actual: run.output,
                    expected_return: case.expected_return,
                    actual_return: run.rc,
                    diff,
                    exit_code: run.exit_code,
                    error: None,
                    latency_ns,
                }
            }
            Err(err) => {
                let actual = format!("unsupported:{err}");
                VerificationResult {
                    case_name: case.name.clone(),
                    function: case.function.clone(),
                    spec_section: case.spec_section.clone(),
                    passed: false,
                    diff: Some(diff::render_diff(&case.expected_output, &actual)),
                    expected: case.expected_output.clone(),
                    actual,
                    expected_return: case.expected_return,
                    actual_return: None,
                    exit_code: None,
                    error: Some(err.to_string()),
                    latency_ns,
                }
            }
        }
    }

    /// Execute a single case without comparing its result.
    pub fn execute(&self, case: &FixtureCase) -> Result<Execution, HarnessError> {
        match case.function.as_str() {
            "strlen" => {
                let bytes = case.parse_inputs::<StrlenInputs>()?.into_bytes();
                let s = CString::new(bytes).map_err(|e| HarnessError::InvalidInput {
                    case: case.name.clone(),
                    message: e.to_string(),
                })?;
                let len = cstr_len(&s);
                Ok(Execution {
                    output: len.to_string(),
                    rc: i64::try_from(len).ok(),
                    exit_code: None,
                    refused: false,
                })
            }
            "printf" => {
                let inputs: PrintfInputs = case.parse_inputs()?;
                let probe = self.probe.as_ref().ok_or(HarnessError::ProbeUnavailable)?;
                let out = completed(probe.printf(
                    &inputs.format,
                    inputs.arg.as_ref(),
                    inputs.checked,
                )?)?;
                let output = out.stdout.clone();
                Ok(Execution::from_probe(out, output))
            }
            "printf_concurrent" => {
                let inputs: ConcurrentInputs = case.parse_inputs()?;
                let probe = self.probe.as_ref().ok_or(HarnessError::ProbeUnavailable)?;
                let out = completed(probe.concurrent(&inputs.lines, inputs.repeat)?)?;
                let output = sorted_lines(&out.stdout);
                Ok(Execution::from_probe(out, output))
            }
            other => Err(HarnessError::UnknownFunction(other.to_string())),
        }
    }
}

/// A child killed by a signal has no exit status and never finished its call.
fn completed(out: ProbeOutput) -> Result<ProbeOutput, HarnessError> {
    if out.exit_code.is_none() {
        return Err(HarnessError::ProbeFailed {
            status: "terminated by signal".to_string(),
            stderr: out.stderr,
        });
    }
    Ok(out)
}

/// Native symbol a fixture function exercises.
fn native_symbol(function: &str) -> &str {
    match function {
        "printf_concurrent" => "printf",
        other => other,
    }
}

/// Lines of `text` in sorted order, each newline-terminated.
///
/// Concurrent writers have no defined ordering relative to each other, so
/// their output is compared as a multiset of whole lines.
#[must_use]
pub fn sorted_lines(text: &str) -> String {
    let mut lines: Vec<&str> = text.split_inclusive('\n').collect();
    lines.sort_unstable();
    lines.concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strlen_set(cases: &str) -> FixtureSet {
        FixtureSet::from_json(&format!(
            r#"{{"version":"v1","family":"string/strlen","captured_at":"2026-10-16T00:00:00Z","cases":[{cases}]}}"#
        ))
        .expect("valid fixture json")
    }

    #[test]
    fn strlen_cases_run_in_process() {
        let set = strlen_set(
            r#"{"name":"len","function":"strlen","spec_section":"C11 7.24.6.3","inputs":{"s":"hello"},"expected_output":"5"},
               {"name":"empty","function":"strlen","spec_section":"C11 7.24.6.3","inputs":{"s":""},"expected_output":"0","expected_return":0},
               {"name":"bytes","function":"strlen","spec_section":"C11 7.24.6.3","inputs":{"bytes":[1,255,128]},"expected_output":"3"}"#,
        );
        let results = TestRunner::new("smoke").run(&set);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.passed), "{results:#?}");
    }

    #[test]
    fn strlen_mismatch_carries_diff() {
        let set = strlen_set(
            r#"{"name":"wrong","function":"strlen","spec_section":"","inputs":{"s":"abc"},"expected_output":"4"}"#,
        );
        let results = TestRunner::new("smoke").run(&set);
        assert!(!results[0].passed);
        assert_eq!(results[0].actual, "3");
        assert!(results[0].diff.as_deref().unwrap().contains("-4"));
    }

    #[test]
    fn interior_null_is_invalid_input() {
        let set = strlen_set(
            r#"{"name":"nul","function":"strlen","spec_section":"","inputs":{"bytes":[65,0,66]},"expected_output":"1"}"#,
        );
        let err = TestRunner::new("smoke").execute(&set.cases[0]).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidInput { .. }));
    }

    #[test]
    fn printf_without_probe_is_unsupported() {
        let set = strlen_set(
            r#"{"name":"lit","function":"printf","spec_section":"","inputs":{"format":"hello\n"},"expected_output":"hello\n","expected_return":6}"#,
        );
        let results = TestRunner::new("smoke").run(&set);
        assert!(!results[0].passed);
        assert!(results[0].actual.starts_with("unsupported:no probe"));
        assert_eq!(results[0].error.as_deref(), Some("no probe binary configured"));
    }

    #[test]
    fn unknown_function_is_reported() {
        let set = strlen_set(
            r#"{"name":"x","function":"puts","spec_section":"","inputs":{},"expected_output":""}"#,
        );
        let err = TestRunner::new("smoke").execute(&set.cases[0]).unwrap_err();
        assert!(matches!(err, HarnessError::UnknownFunction(name) if name == "puts"));
    }

    #[test]
    fn run_logged_emits_one_valid_record_per_case() {
        let set = strlen_set(
            r#"{"name":"a","function":"strlen","spec_section":"","inputs":{"s":"a"},"expected_output":"1"},
               {"name":"b","function":"strlen","spec_section":"","inputs":{"s":"bb"},"expected_output":"9"}"#,
        );
        let mut emitter = LogEmitter::to_buffer("smoke", "r1");
        let results = TestRunner::new("smoke")
            .run_logged(&set, &mut emitter)
            .unwrap();
        assert_eq!(results.len(), 2);

        let text = String::from_utf8(emitter.into_inner()).unwrap();
        let entries: Vec<_> = text
            .lines()
            .enumerate()
            .map(|(i, l)| crate::structured_log::validate_log_line(l, i + 1).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].outcome, Some(Outcome::Pass));
        assert_eq!(entries[1].outcome, Some(Outcome::Fail));
        assert_eq!(entries[1].symbol.as_deref(), Some("strlen"));
        assert!(entries[1].details.as_ref().unwrap()["diff"].is_string());
    }

    #[test]
    fn execution_error_is_logged_as_error_outcome() {
        let set = strlen_set(
            r#"{"name":"x","function":"puts","spec_section":"","inputs":{},"expected_output":""}"#,
        );
        let mut emitter = LogEmitter::to_buffer("smoke", "r1");
        TestRunner::new("smoke")
            .run_logged(&set, &mut emitter)
            .unwrap();
        let text = String::from_utf8(emitter.into_inner()).unwrap();
        let entry = crate::structured_log::validate_log_line(text.trim(), 1).unwrap();
        assert_eq!(entry.outcome, Some(Outcome::Error));
        assert!(entry.details.unwrap()["error"].is_string());
    }

    #[test]
    fn sorted_lines_normalizes_order() {
        assert_eq!(sorted_lines("beta\nalpha\n"), "alpha\nbeta\n");
        assert_eq!(sorted_lines(""), "");
    }
}
