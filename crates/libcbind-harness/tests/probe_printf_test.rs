//! Integration tests: the probe binary drives the printf/strlen bindings.
//!
//! Validates:
//! 1. Raw printf output lands on stdout and the native count is reported.
//! 2. The checked path refuses mismatched arguments before anything is written.
//! 3. Concurrent writers never interleave within a line.

use std::process::Command;

use libcbind_harness::probe::{REFUSED_EXIT_CODE, parse_rc};
use libcbind_harness::{Probe, ProbeArg};

fn probe() -> Probe {
    Probe::new(env!("CARGO_BIN_EXE_libcbind-probe"))
}

#[test]
fn literal_format_prints_and_reports_count() {
    let out = probe().printf("hello\n", None, false).expect("run probe");
    assert_eq!(out.stdout, "hello\n");
    assert_eq!(out.rc, Some(6));
    assert_eq!(out.exit_code, Some(0));
}

#[test]
fn int_directive_formats_trailing_argument() {
    let out = probe()
        .printf("%d\n", Some(&ProbeArg::Int(42)), false)
        .expect("run probe");
    assert_eq!(out.stdout, "42\n");
    assert_eq!(out.rc, Some(3));
}

#[test]
fn string_directive_reads_c_string() {
    let out = probe()
        .printf("[%s]\n", Some(&ProbeArg::Str("abc".to_string())), false)
        .expect("run probe");
    assert_eq!(out.stdout, "[abc]\n");
    assert_eq!(out.rc, Some(6));
}

#[test]
fn format_with_leading_hyphen_is_passed_through() {
    let out = probe().printf("-x-\n", None, false).expect("run probe");
    assert_eq!(out.stdout, "-x-\n");
    assert_eq!(out.rc, Some(4));
}

#[test]
fn checked_path_matches_raw_output() {
    let raw = probe()
        .printf("%5.1f|\n", Some(&ProbeArg::Double(2.25)), false)
        .expect("raw probe");
    let checked = probe()
        .printf("%5.1f|\n", Some(&ProbeArg::Double(2.25)), true)
        .expect("checked probe");
    assert_eq!(raw.stdout, checked.stdout);
    assert_eq!(raw.rc, checked.rc);
}

#[test]
fn checked_mismatch_is_refused_without_output() {
    let out = probe()
        .printf("%s\n", Some(&ProbeArg::Int(5)), true)
        .expect("run probe");
    assert_eq!(out.exit_code, Some(i32::from(REFUSED_EXIT_CODE)));
    assert!(out.was_refused());
    assert!(out.stdout.is_empty(), "stdout: {:?}", out.stdout);
    assert_eq!(out.rc, None);
    assert!(out.stderr.contains("error:"), "stderr: {}", out.stderr);
}

#[test]
fn checked_missing_argument_is_refused() {
    let out = probe().printf("%d\n", None, true).expect("run probe");
    assert_eq!(out.exit_code, Some(i32::from(REFUSED_EXIT_CODE)));
    assert!(out.stdout.is_empty());
}

#[test]
fn usage_error_is_not_a_refusal() {
    let out = Command::new(env!("CARGO_BIN_EXE_libcbind-probe"))
        .args(["printf", "--format", "%d\n", "--arg", "bogus:1"])
        .output()
        .expect("run probe");
    assert!(!out.status.success());
    assert_ne!(out.status.code(), Some(i32::from(REFUSED_EXIT_CODE)));
    assert!(out.stdout.is_empty());
}

#[test]
fn lenient_mode_accepts_sign_swap() {
    let strict = Command::new(env!("CARGO_BIN_EXE_libcbind-probe"))
        .args(["printf", "--format", "%u\n", "--arg", "int:7", "--checked"])
        .args(["--mode", "strict"])
        .output()
        .expect("run probe");
    assert_eq!(strict.status.code(), Some(i32::from(REFUSED_EXIT_CODE)));

    let lenient = Command::new(env!("CARGO_BIN_EXE_libcbind-probe"))
        .args(["printf", "--format", "%u\n", "--arg", "int:7", "--checked"])
        .args(["--mode", "lenient"])
        .output()
        .expect("run probe");
    assert!(lenient.status.success());
    assert_eq!(String::from_utf8_lossy(&lenient.stdout), "7\n");
}

#[test]
fn check_mode_env_var_is_honored() {
    let out = Command::new(env!("CARGO_BIN_EXE_libcbind-probe"))
        .args(["printf", "--format", "%d\n", "--arg", "uint:9", "--checked"])
        .env("LIBCBIND_CHECK_MODE", "lenient")
        .output()
        .expect("run probe");
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "9\n");
    assert_eq!(parse_rc(&String::from_utf8_lossy(&out.stderr)), Some(2));
}

#[test]
fn strlen_subcommand_reports_length() {
    let out = probe().strlen("hello, world").expect("run probe");
    assert_eq!(out.rc, Some(12));
    assert!(out.stdout.is_empty());
}

#[test]
fn concurrent_writers_keep_lines_whole() {
    let lines: Vec<String> = (0..8).map(|i| format!("writer-{i}-{}", "x".repeat(64))).collect();
    let out = probe().concurrent(&lines, 50).expect("run probe");
    assert_eq!(out.exit_code, Some(0), "stderr: {}", out.stderr);

    let printed: Vec<&str> = out.stdout.lines().collect();
    assert_eq!(printed.len(), lines.len() * 50);
    for line in &lines {
        let count = printed.iter().filter(|p| **p == line.as_str()).count();
        assert_eq!(count, 50, "line {line} torn or lost");
    }

    let expected_bytes: usize = lines.iter().map(|l| (l.len() + 1) * 50).sum();
    assert_eq!(out.rc, Some(expected_bytes as i64));
}
