//! Child-process driver for the `libcbind-probe` binary.
//!
//! `printf` writes to the process's C `stdout`, so its output can only be
//! observed from outside the process. The probe makes the call, flushes C
//! stdio, and reports the native return value on stderr as `rc=<n>`.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::HarnessError;
use crate::fixtures::ProbeArg;

/// Exit status of a probe whose checked call was refused with a
/// `FormatError`. Distinct from clap's usage-error status (2) and from a
/// generic failure (1).
pub const REFUSED_EXIT_CODE: u8 = 3;

/// Captured result of one probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutput {
    /// Bytes the bound routine wrote to stdout.
    pub stdout: String,
    /// Native return value reported by the probe, if any.
    pub rc: Option<i64>,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl ProbeOutput {
    /// True if the probe refused the call before it reached libc.
    #[must_use]
    pub fn was_refused(&self) -> bool {
        self.exit_code == Some(i32::from(REFUSED_EXIT_CODE))
            && self.stderr.lines().any(|l| l.starts_with("error:"))
    }

    /// The reported return value, or an error if the probe did not report one.
    pub fn require_rc(&self) -> Result<i64, HarnessError> {
        self.rc.ok_or(HarnessError::MissingReturn)
    }
}

/// Handle on a probe executable.
#[derive(Debug, Clone)]
pub struct Probe {
    path: PathBuf,
}

impl Probe {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The probe installed next to the running executable.
    pub fn sibling_of_current_exe() -> Result<Self, HarnessError> {
        let exe = std::env::current_exe()?;
        Ok(Self::new(
            exe.with_file_name(format!("libcbind-probe{}", std::env::consts::EXE_SUFFIX)),
        ))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run one `printf` call in the probe.
    pub fn printf(
        &self,
        format: &str,
        arg: Option<&ProbeArg>,
        checked: bool,
    ) -> Result<ProbeOutput, HarnessError> {
        let mut args = vec!["printf".to_string(), "--format".to_string(), format.to_string()];
        if let Some(arg) = arg {
            args.push("--arg".to_string());
            args.push(arg.to_string());
        }
        if checked {
            args.push("--checked".to_string());
        }
        self.run(&args)
    }

    /// Run one writer thread per line, each printing its line `repeat` times.
    pub fn concurrent(&self, lines: &[String], repeat: usize) -> Result<ProbeOutput, HarnessError> {
        let mut args = vec![
            "concurrent".to_string(),
            "--repeat".to_string(),
            repeat.to_string(),
        ];
        for line in lines {
            args.push("--line".to_string());
            args.push(line.clone());
        }
        self.run(&args)
    }

    /// Run `strlen` in the probe.
    pub fn strlen(&self, text: &str) -> Result<ProbeOutput, HarnessError> {
        self.run(&["strlen".to_string(), "--text".to_string(), text.to_string()])
    }

    fn run(&self, args: &[String]) -> Result<ProbeOutput, HarnessError> {
        let output = Command::new(&self.path)
            .args(args)
            .output()
            .map_err(|source| HarnessError::ProbeSpawn {
                path: self.path.display().to_string(),
                source,
            })?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        Ok(ProbeOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            rc: parse_rc(&stderr),
            exit_code: output.status.code(),
            stderr,
        })
    }
}

/// Extract the last `rc=<n>` line from probe stderr.
#[must_use]
pub fn parse_rc(stderr: &str) -> Option<i64> {
    stderr
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix("rc="))
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rc_takes_last_report() {
        assert_eq!(parse_rc("rc=6\n"), Some(6));
        assert_eq!(parse_rc("noise\nrc=1\nrc=-1\n"), Some(-1));
        assert_eq!(parse_rc("error: mismatch\n"), None);
        assert_eq!(parse_rc("rc=abc\n"), None);
    }

    #[test]
    fn missing_probe_is_a_spawn_error() {
        let probe = Probe::new("/nonexistent/libcbind-probe");
        let err = probe.printf("x", None, false).unwrap_err();
        assert!(matches!(err, HarnessError::ProbeSpawn { .. }));
    }

    #[test]
    fn require_rc_reports_missing_value() {
        let out = ProbeOutput {
            stdout: String::new(),
            rc: None,
            exit_code: Some(2),
            stderr: String::new(),
        };
        assert!(matches!(out.require_rc(), Err(HarnessError::MissingReturn)));
    }

    #[test]
    fn refusal_needs_status_and_message() {
        let mut out = ProbeOutput {
            stdout: String::new(),
            rc: None,
            exit_code: Some(i32::from(REFUSED_EXIT_CODE)),
            stderr: "error: argument 0 for `%s`: expected C string\n".to_string(),
        };
        assert!(out.was_refused());

        out.stderr = String::new();
        assert!(!out.was_refused());

        out.stderr = "error: unexpected argument\n".to_string();
        out.exit_code = Some(2);
        assert!(!out.was_refused());
    }
}
