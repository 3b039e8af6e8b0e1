//! Probe process for libcbind conformance runs.
//!
//! Makes one kind of bound call, flushes C stdio so everything the native
//! routine wrote reaches the pipe, then reports the native return value on
//! stderr as `rc=<n>`. Exit status [`REFUSED_EXIT_CODE`] means the checked
//! layer refused the call before it reached libc. Any other failure exits 1.

#![allow(unsafe_code)]

use std::ffi::{CStr, CString, NulError, c_int, c_uint};
use std::process::ExitCode;
use std::sync::Barrier;
use std::thread;

use clap::{Parser, Subcommand};
use thiserror::Error;

use libcbind_abi::{CheckMode, FormatError, checked_printf, cstr_len, printf, set_check_mode};
use libcbind_harness::ProbeArg;
use libcbind_harness::probe::REFUSED_EXIT_CODE;

/// Make a single bound libc call and report its return value.
#[derive(Debug, Parser)]
#[command(name = "libcbind-probe")]
#[command(about = "Exercise the printf/strlen bindings in a child process")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Call printf with a format string and at most one trailing argument.
    Printf {
        #[arg(long, allow_hyphen_values = true)]
        format: String,
        /// Trailing argument as `<kind>:<value>` (int, long, uint, double, str).
        #[arg(long, allow_hyphen_values = true)]
        arg: Option<ProbeArg>,
        /// Validate through checked_printf! instead of calling the raw binding.
        #[arg(long)]
        checked: bool,
        /// Checked-layer mode override (`strict` or `lenient`).
        #[arg(long)]
        mode: Option<String>,
    },
    /// Call strlen on the given text.
    Strlen {
        #[arg(long, allow_hyphen_values = true)]
        text: String,
    },
    /// Print each line from its own thread, all released together.
    Concurrent {
        #[arg(long = "line", required = true)]
        lines: Vec<String>,
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },
}

#[derive(Debug, Error)]
enum ProbeError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("argument contains an interior null byte: {0}")]
    Nul(#[from] NulError),
    #[error("length {0} does not fit the reported return type")]
    Overflow(usize),
    #[error("a writer thread panicked")]
    WriterPanicked,
}

/// A probe argument lowered to the value passed through `...`.
enum FfiArg {
    Int(c_int),
    Long(i64),
    Uint(c_uint),
    Double(f64),
    Str(CString),
}

impl TryFrom<ProbeArg> for FfiArg {
    type Error = NulError;

    fn try_from(arg: ProbeArg) -> Result<Self, Self::Error> {
        Ok(match arg {
            ProbeArg::Int(v) => Self::Int(v),
            ProbeArg::Long(v) => Self::Long(v),
            ProbeArg::Uint(v) => Self::Uint(v),
            ProbeArg::Double(v) => Self::Double(v),
            ProbeArg::Str(v) => Self::Str(CString::new(v)?),
        })
    }
}

fn raw_printf(format: &CStr, arg: Option<&FfiArg>) -> c_int {
    let fmt = format.as_ptr();
    // SAFETY: the raw path forwards exactly what the caller asked for. The
    // caller is responsible for `format` matching `arg`, as with C printf.
    unsafe {
        match arg {
            None => printf(fmt),
            Some(FfiArg::Int(v)) => printf(fmt, *v),
            Some(FfiArg::Long(v)) => printf(fmt, *v),
            Some(FfiArg::Uint(v)) => printf(fmt, *v),
            Some(FfiArg::Double(v)) => printf(fmt, *v),
            Some(FfiArg::Str(s)) => printf(fmt, s.as_ptr()),
        }
    }
}

fn checked(format: &CStr, arg: Option<&FfiArg>) -> Result<c_int, FormatError> {
    match arg {
        None => checked_printf!(format),
        Some(FfiArg::Int(v)) => checked_printf!(format, *v),
        Some(FfiArg::Long(v)) => checked_printf!(format, *v),
        Some(FfiArg::Uint(v)) => checked_printf!(format, *v),
        Some(FfiArg::Double(v)) => checked_printf!(format, *v),
        Some(FfiArg::Str(s)) => checked_printf!(format, s.as_c_str()),
    }
}

fn concurrent(lines: &[String], repeat: usize) -> Result<i64, ProbeError> {
    let lines = lines
        .iter()
        .map(|l| CString::new(l.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    let barrier = Barrier::new(lines.len());
    let barrier = &barrier;

    let totals = thread::scope(|scope| {
        let handles: Vec<_> = lines
            .iter()
            .map(|line| {
                scope.spawn(move || {
                    barrier.wait();
                    let mut written: i64 = 0;
                    for _ in 0..repeat {
                        // SAFETY: "%s\n" takes one C string and `line` is one.
                        let rc = unsafe { printf(c"%s\n".as_ptr(), line.as_ptr()) };
                        if rc < 0 {
                            return i64::from(rc);
                        }
                        written += i64::from(rc);
                    }
                    written
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join())
            .collect::<Result<Vec<_>, _>>()
    })
    .map_err(|_| ProbeError::WriterPanicked)?;

    Ok(match totals.iter().find(|&&rc| rc < 0) {
        Some(&negative) => negative,
        None => totals.iter().sum(),
    })
}

fn run(command: Command) -> Result<i64, ProbeError> {
    match command {
        Command::Printf {
            format,
            arg,
            checked: use_checked,
            mode,
        } => {
            if let Some(mode) = mode {
                set_check_mode(CheckMode::from_str_loose(&mode));
            }
            let format = CString::new(format)?;
            let arg = arg.map(FfiArg::try_from).transpose()?;
            let rc = if use_checked {
                checked(&format, arg.as_ref())?
            } else {
                raw_printf(&format, arg.as_ref())
            };
            Ok(i64::from(rc))
        }
        Command::Strlen { text } => {
            let text = CString::new(text)?;
            let len = cstr_len(&text);
            i64::try_from(len).map_err(|_| ProbeError::Overflow(len))
        }
        Command::Concurrent { lines, repeat } => concurrent(&lines, repeat),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = run(cli.command);

    // SAFETY: a null stream flushes every open C output stream.
    unsafe {
        libc::fflush(std::ptr::null_mut());
    }

    match result {
        Ok(rc) => {
            eprintln!("rc={rc}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            match err {
                ProbeError::Format(_) => ExitCode::from(REFUSED_EXIT_CODE),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
